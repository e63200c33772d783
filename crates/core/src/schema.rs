//! Widget schema registry.
//!
//! Schemas declare which settings and block types a widget type accepts.
//! They are loaded once (built-in core widgets plus optional theme
//! definitions from a directory) and are read-only afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::widget::Settings;

/// Built-in widget schemas shipped with the core crate.
const CORE_WIDGETS_JSON: &str = include_str!("../schemas/core_widgets.json");

/// Declared type of a single setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    Text,
    Textarea,
    Richtext,
    Link,
    Color,
    Number,
    Range,
    Select,
    Radio,
    Checkbox,
    Image,
    Video,
    Audio,
    Code,
    FontPicker,
}

impl SettingType {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Richtext => "richtext",
            Self::Link => "link",
            Self::Color => "color",
            Self::Number => "number",
            Self::Range => "range",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Code => "code",
            Self::FontPicker => "font_picker",
        }
    }

    /// Media reference types whose values are paths into the upload store.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio)
    }
}

impl std::fmt::Display for SettingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One allowed value of a `select`/`radio` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Declaration of one setting in a widget or block schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// HTML element used when rendering text-like settings (defaults to `div`).
    #[serde(default)]
    pub element: Option<String>,
}

impl SettingSchema {
    /// Returns `true` if `value` is one of the declared options.
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Declaration of a block type owned by a widget schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: Vec<SettingSchema>,
}

impl BlockSchema {
    /// Look up a setting declaration by id.
    pub fn setting(&self, id: &str) -> Option<&SettingSchema> {
        self.settings.iter().find(|s| s.id == id)
    }

    /// Settings object populated with every declared default.
    pub fn default_settings(&self) -> Settings {
        defaults_for(&self.settings)
    }
}

/// A block created automatically when a widget is added to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub settings: Settings,
}

/// Full schema of one widget type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSchema {
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: Vec<SettingSchema>,
    #[serde(default)]
    pub blocks: Vec<BlockSchema>,
    #[serde(default)]
    pub default_blocks: Vec<DefaultBlock>,
    #[serde(default)]
    pub max_blocks: Option<usize>,
}

impl WidgetSchema {
    /// Look up a widget-level setting declaration by id.
    pub fn setting(&self, id: &str) -> Option<&SettingSchema> {
        self.settings.iter().find(|s| s.id == id)
    }

    /// Resolve a declared block type.
    pub fn block(&self, block_type: &str) -> Result<&BlockSchema, CoreError> {
        self.blocks
            .iter()
            .find(|b| b.block_type == block_type)
            .ok_or_else(|| CoreError::UnknownBlockType {
                widget_type: self.widget_type.clone(),
                block_type: block_type.to_string(),
            })
    }

    /// Settings object populated with every declared default.
    pub fn default_settings(&self) -> Settings {
        defaults_for(&self.settings)
    }

    /// Check internal consistency: unique setting ids, unique block types,
    /// default blocks referencing declared types.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.widget_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "Widget schema type must not be empty".to_string(),
            ));
        }
        ensure_unique_ids(&self.widget_type, &self.settings)?;
        let mut seen = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if seen.contains(&block.block_type.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Widget schema '{}' declares block type '{}' twice",
                    self.widget_type, block.block_type
                )));
            }
            seen.push(block.block_type.as_str());
            ensure_unique_ids(&self.widget_type, &block.settings)?;
        }
        for default_block in &self.default_blocks {
            self.block(&default_block.block_type)?;
        }
        Ok(())
    }
}

fn defaults_for(settings: &[SettingSchema]) -> Settings {
    settings
        .iter()
        .filter_map(|s| s.default.clone().map(|d| (s.id.clone(), d)))
        .collect()
}

fn ensure_unique_ids(widget_type: &str, settings: &[SettingSchema]) -> Result<(), CoreError> {
    for (i, setting) in settings.iter().enumerate() {
        if settings[..i].iter().any(|s| s.id == setting.id) {
            return Err(CoreError::Validation(format!(
                "Widget schema '{widget_type}' declares setting '{}' twice",
                setting.id
            )));
        }
    }
    Ok(())
}

/// Read-only lookup of widget schemas by type.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<WidgetSchema>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in core widgets.
    pub fn builtin() -> Result<Self, CoreError> {
        let schemas: Vec<WidgetSchema> = serde_json::from_str(CORE_WIDGETS_JSON)
            .map_err(|e| CoreError::Internal(format!("Invalid built-in widget schemas: {e}")))?;
        let mut registry = Self::new();
        for schema in schemas {
            registry.insert(schema)?;
        }
        Ok(registry)
    }

    /// Register a schema. A later schema for the same type replaces the
    /// earlier one (theme definitions override core widgets).
    pub fn insert(&mut self, schema: WidgetSchema) -> Result<(), CoreError> {
        schema.validate()?;
        if self.schemas.contains_key(&schema.widget_type) {
            tracing::debug!(widget_type = %schema.widget_type, "Overriding widget schema");
        }
        self.schemas
            .insert(schema.widget_type.clone(), Arc::new(schema));
        Ok(())
    }

    /// Load every `*.json` file in `dir`. Each file holds either a single
    /// schema object or an array of them. Returns the number of schemas
    /// registered.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CoreError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CoreError::Internal(format!("Cannot read schema directory {}: {e}", dir.display()))
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        // Deterministic override order.
        paths.sort();

        let mut count = 0;
        for path in paths {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                CoreError::Internal(format!("Cannot read schema file {}: {e}", path.display()))
            })?;
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                CoreError::Validation(format!("Invalid JSON in {}: {e}", path.display()))
            })?;
            let schemas: Vec<WidgetSchema> = match value {
                Value::Array(_) => serde_json::from_value(value),
                other => serde_json::from_value(other).map(|s| vec![s]),
            }
            .map_err(|e| {
                CoreError::Validation(format!("Invalid widget schema in {}: {e}", path.display()))
            })?;
            for schema in schemas {
                self.insert(schema)?;
                count += 1;
            }
        }

        tracing::info!(dir = %dir.display(), count, "Loaded widget schemas");
        Ok(count)
    }

    /// Resolve the schema for a widget type.
    pub fn get(&self, widget_type: &str) -> Result<&WidgetSchema, CoreError> {
        self.schemas
            .get(widget_type)
            .map(|s| s.as_ref())
            .ok_or_else(|| CoreError::UnknownWidgetType(widget_type.to_string()))
    }

    /// Returns `true` if the registry knows `widget_type`.
    pub fn contains(&self, widget_type: &str) -> bool {
        self.schemas.contains_key(widget_type)
    }

    /// All registered widget types, sorted.
    pub fn widget_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if no schemas are registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
