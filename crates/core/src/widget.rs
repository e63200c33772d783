//! Widget and block data model.
//!
//! A widget owns an unordered `blocks` map plus a `blocks_order` sequence;
//! every id in one must appear in the other. All block lifecycle
//! operations below preserve that invariant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::schema::WidgetSchema;
use crate::types::BlockId;

/// Setting id → value. `serde_json::Map` is key-ordered, so equal settings
/// compare and serialize identically regardless of insertion order.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// A repeatable sub-unit owned by exactly one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub settings: Settings,
}

impl Block {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            settings: Settings::new(),
        }
    }
}

/// A typed content unit on a page (or a global header/footer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub blocks: BTreeMap<BlockId, Block>,
    #[serde(default)]
    pub blocks_order: Vec<BlockId>,
}

impl Widget {
    /// Create an empty widget of the given type.
    pub fn new(widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            settings: Settings::new(),
            blocks: BTreeMap::new(),
            blocks_order: Vec::new(),
        }
    }

    /// Create a widget populated with the schema's default settings and
    /// default blocks. Block ids come from `next_id`.
    pub fn from_schema(schema: &WidgetSchema, mut next_id: impl FnMut() -> BlockId) -> Self {
        let mut widget = Self::new(schema.widget_type.clone());
        widget.settings = schema.default_settings();
        for default_block in &schema.default_blocks {
            // Declared default blocks were validated against the schema on load.
            let mut settings = schema
                .block(&default_block.block_type)
                .map(|b| b.default_settings())
                .unwrap_or_default();
            settings.extend(default_block.settings.clone());
            let id = next_id();
            widget.blocks_order.push(id.clone());
            widget.blocks.insert(
                id,
                Block {
                    block_type: default_block.block_type.clone(),
                    settings,
                },
            );
        }
        widget
    }

    /// Blocks in render order.
    pub fn ordered_blocks(&self) -> impl Iterator<Item = (&BlockId, &Block)> {
        self.blocks_order
            .iter()
            .filter_map(|id| self.blocks.get_key_value(id))
    }

    /// Verify that `blocks` and `blocks_order` describe the same id set,
    /// with no duplicates in the order.
    pub fn validate_blocks(&self) -> Result<(), CoreError> {
        if self.blocks_order.len() != self.blocks.len() {
            return Err(CoreError::Validation(format!(
                "blocksOrder has {} entries but blocks has {}",
                self.blocks_order.len(),
                self.blocks.len()
            )));
        }
        for (i, id) in self.blocks_order.iter().enumerate() {
            if !self.blocks.contains_key(id) {
                return Err(CoreError::Validation(format!(
                    "blocksOrder references missing block '{id}'"
                )));
            }
            if self.blocks_order[..i].contains(id) {
                return Err(CoreError::Validation(format!(
                    "blocksOrder lists block '{id}' twice"
                )));
            }
        }
        Ok(())
    }

    /// Add a block of `block_type` with schema defaults applied, appended
    /// at the end of the order.
    pub fn add_block(
        &mut self,
        schema: &WidgetSchema,
        block_id: BlockId,
        block_type: &str,
    ) -> Result<&Block, CoreError> {
        let block_schema = schema.block(block_type)?;
        if let Some(max) = schema.max_blocks {
            if self.blocks.len() >= max {
                return Err(CoreError::Validation(format!(
                    "Widget type '{}' allows at most {max} blocks",
                    schema.widget_type
                )));
            }
        }
        if self.blocks.contains_key(&block_id) {
            return Err(CoreError::Conflict(format!("Block '{block_id}' already exists")));
        }
        self.blocks_order.push(block_id.clone());
        let block = self.blocks.entry(block_id).or_insert(Block {
            block_type: block_type.to_string(),
            settings: block_schema.default_settings(),
        });
        Ok(block)
    }

    /// Deep-copy `source_id` under `new_id`, inserted immediately after the
    /// source in the order.
    pub fn duplicate_block(&mut self, source_id: &str, new_id: BlockId) -> Result<(), CoreError> {
        let copy = self
            .blocks
            .get(source_id)
            .cloned()
            .ok_or_else(|| block_not_found(source_id))?;
        if self.blocks.contains_key(&new_id) {
            return Err(CoreError::Conflict(format!("Block '{new_id}' already exists")));
        }
        let position = self
            .blocks_order
            .iter()
            .position(|id| id == source_id)
            .ok_or_else(|| block_not_found(source_id))?;
        self.blocks_order.insert(position + 1, new_id.clone());
        self.blocks.insert(new_id, copy);
        Ok(())
    }

    /// Remove a block from both `blocks` and `blocks_order`.
    pub fn delete_block(&mut self, block_id: &str) -> Result<Block, CoreError> {
        let block = self
            .blocks
            .remove(block_id)
            .ok_or_else(|| block_not_found(block_id))?;
        self.blocks_order.retain(|id| id != block_id);
        Ok(block)
    }

    /// Replace the block order with a permutation of the current one.
    pub fn reorder_blocks(&mut self, new_order: Vec<BlockId>) -> Result<(), CoreError> {
        let mut current = self.blocks_order.clone();
        let mut proposed = new_order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return Err(CoreError::Validation(
                "New block order must be a permutation of the existing order".to_string(),
            ));
        }
        self.blocks_order = new_order;
        Ok(())
    }
}

fn block_not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Block",
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn counter_ids() -> impl FnMut() -> BlockId {
        let mut n = 0;
        move || {
            n += 1;
            format!("b{n}")
        }
    }

    fn gallery() -> Widget {
        let registry = SchemaRegistry::builtin().unwrap();
        Widget::from_schema(registry.get("gallery").unwrap(), counter_ids())
    }

    #[test]
    fn from_schema_applies_defaults_and_default_blocks() {
        let widget = gallery();
        assert_eq!(widget.widget_type, "gallery");
        assert_eq!(widget.settings["columns"], json!(3));
        assert_eq!(widget.blocks_order, vec!["b1", "b2", "b3"]);
        assert!(widget.validate_blocks().is_ok());
    }

    #[test]
    fn add_block_appends_with_defaults() {
        let registry = SchemaRegistry::builtin().unwrap();
        let schema = registry.get("hero").unwrap();
        let mut widget = Widget::from_schema(schema, counter_ids());

        let block = widget.add_block(schema, "extra".into(), "button").unwrap();
        assert_eq!(block.settings["style"], json!("primary"));
        assert_eq!(widget.blocks_order.last().unwrap(), "extra");
        assert!(widget.validate_blocks().is_ok());
    }

    #[test]
    fn add_block_respects_max_blocks() {
        let registry = SchemaRegistry::builtin().unwrap();
        let schema = registry.get("hero").unwrap();
        let mut widget = Widget::from_schema(schema, counter_ids());
        widget.add_block(schema, "second".into(), "button").unwrap();

        assert_matches!(
            widget.add_block(schema, "third".into(), "button"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn add_block_rejects_unknown_type() {
        let registry = SchemaRegistry::builtin().unwrap();
        let schema = registry.get("gallery").unwrap();
        let mut widget = gallery();
        assert_matches!(
            widget.add_block(schema, "x".into(), "slide"),
            Err(CoreError::UnknownBlockType { .. })
        );
        assert!(widget.validate_blocks().is_ok());
    }

    #[test]
    fn duplicate_inserts_deep_copy_after_source() {
        let mut widget = gallery();
        widget
            .blocks
            .get_mut("b1")
            .unwrap()
            .settings
            .insert("caption".into(), json!("First"));

        widget.duplicate_block("b1", "copy".into()).unwrap();

        assert_eq!(widget.blocks_order, vec!["b1", "copy", "b2", "b3"]);
        assert_eq!(widget.blocks["copy"], widget.blocks["b1"]);

        // Deep copy: editing the copy leaves the source alone.
        widget
            .blocks
            .get_mut("copy")
            .unwrap()
            .settings
            .insert("caption".into(), json!("Second"));
        assert_eq!(widget.blocks["b1"].settings["caption"], json!("First"));
    }

    #[test]
    fn delete_removes_from_both_structures() {
        let mut widget = gallery();
        widget.delete_block("b2").unwrap();
        assert_eq!(widget.blocks_order, vec!["b1", "b3"]);
        assert!(!widget.blocks.contains_key("b2"));
        assert_matches!(widget.delete_block("b2"), Err(CoreError::NotFound { .. }));
    }

    #[test]
    fn reorder_requires_permutation() {
        let mut widget = gallery();
        widget
            .reorder_blocks(vec!["b3".into(), "b1".into(), "b2".into()])
            .unwrap();
        assert_eq!(widget.blocks_order, vec!["b3", "b1", "b2"]);

        assert!(widget.reorder_blocks(vec!["b3".into(), "b1".into()]).is_err());
        assert!(widget
            .reorder_blocks(vec!["b3".into(), "b1".into(), "b1".into()])
            .is_err());
        assert_eq!(widget.blocks_order, vec!["b3", "b1", "b2"]);
    }

    #[test]
    fn validate_blocks_detects_drift() {
        let mut widget = gallery();
        widget.blocks_order.push("ghost".into());
        assert!(widget.validate_blocks().is_err());

        let mut widget = gallery();
        widget.blocks_order[1] = "b1".into();
        widget.blocks_order.pop();
        widget.blocks.remove("b3");
        assert!(widget.validate_blocks().is_err());
    }

    #[test]
    fn deserializes_camel_case_wire_shape() {
        let widget: Widget = serde_json::from_value(json!({
            "type": "hero",
            "settings": { "title": "Hi" },
            "blocks": { "x": { "type": "button", "settings": {} } },
            "blocksOrder": ["x"]
        }))
        .unwrap();
        assert_eq!(widget.widget_type, "hero");
        assert_eq!(widget.ordered_blocks().count(), 1);
    }
}
