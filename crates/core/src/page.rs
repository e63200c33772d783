//! Page and global-widget containers.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{is_reserved_widget_id, WidgetId, FOOTER_ID, HEADER_ID};
use crate::widget::Widget;

/// Direction of an in-preview reorder affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MoveDirection {
    Up,
    Down,
}

/// A page: page-scoped widgets plus their vertical order.
///
/// `header`/`footer` are never stored here; they live in [`GlobalWidgets`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub widgets: BTreeMap<WidgetId, Widget>,
    #[serde(default)]
    pub widgets_order: Vec<WidgetId>,
}

impl Page {
    /// Widgets in layout order.
    pub fn ordered_widgets(&self) -> impl Iterator<Item = (&WidgetId, &Widget)> {
        self.widgets_order
            .iter()
            .filter_map(|id| self.widgets.get_key_value(id))
    }

    /// Insert a widget at `position` (clamped to the end).
    pub fn insert_widget(
        &mut self,
        widget_id: WidgetId,
        widget: Widget,
        position: Option<usize>,
    ) -> Result<(), CoreError> {
        if is_reserved_widget_id(&widget_id) {
            return Err(CoreError::Validation(format!(
                "'{widget_id}' is reserved for global widgets"
            )));
        }
        if self.widgets.contains_key(&widget_id) {
            return Err(CoreError::Conflict(format!(
                "Widget '{widget_id}' already exists"
            )));
        }
        let index = position
            .unwrap_or(self.widgets_order.len())
            .min(self.widgets_order.len());
        self.widgets_order.insert(index, widget_id.clone());
        self.widgets.insert(widget_id, widget);
        Ok(())
    }

    /// Remove a widget from both the map and the order.
    pub fn delete_widget(&mut self, widget_id: &str) -> Result<Widget, CoreError> {
        let widget = self
            .widgets
            .remove(widget_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Widget",
                id: widget_id.to_string(),
            })?;
        self.widgets_order.retain(|id| id != widget_id);
        Ok(widget)
    }

    /// Swap a widget with its neighbour. Returns `false` (and leaves the
    /// order untouched) when the widget is already at that edge.
    pub fn move_widget(
        &mut self,
        widget_id: &str,
        direction: MoveDirection,
    ) -> Result<bool, CoreError> {
        let index = self
            .widgets_order
            .iter()
            .position(|id| id == widget_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Widget",
                id: widget_id.to_string(),
            })?;
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < self.widgets_order.len() => index + 1,
            _ => return Ok(false),
        };
        self.widgets_order.swap(index, target);
        Ok(true)
    }

    /// Check that `widgets` and `widgets_order` agree, that no reserved id is
    /// stored on the page, and that every widget's blocks are consistent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(id) = self.widgets.keys().find(|id| is_reserved_widget_id(id)) {
            return Err(CoreError::Validation(format!(
                "Global widget '{id}' must not be stored on a page"
            )));
        }
        if self.widgets_order.len() != self.widgets.len() {
            return Err(CoreError::Validation(format!(
                "widgetsOrder has {} entries but widgets has {}",
                self.widgets_order.len(),
                self.widgets.len()
            )));
        }
        for (i, id) in self.widgets_order.iter().enumerate() {
            if !self.widgets.contains_key(id) {
                return Err(CoreError::Validation(format!(
                    "widgetsOrder references missing widget '{id}'"
                )));
            }
            if self.widgets_order[..i].contains(id) {
                return Err(CoreError::Validation(format!(
                    "widgetsOrder lists widget '{id}' twice"
                )));
            }
        }
        for (id, widget) in &self.widgets {
            widget
                .validate_blocks()
                .map_err(|e| CoreError::Validation(format!("Widget '{id}': {e}")))?;
        }
        Ok(())
    }
}

/// Which global widget slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalWidgetKind {
    Header,
    Footer,
}

impl GlobalWidgetKind {
    /// The reserved widget id of this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => HEADER_ID,
            Self::Footer => FOOTER_ID,
        }
    }
}

impl std::fmt::Display for GlobalWidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalWidgetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            HEADER_ID => Ok(Self::Header),
            FOOTER_ID => Ok(Self::Footer),
            other => Err(CoreError::Validation(format!(
                "Unknown global widget type '{other}'. Must be one of: header, footer"
            ))),
        }
    }
}

/// Header and footer, shared across all pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalWidgets {
    #[serde(default)]
    pub header: Option<Widget>,
    #[serde(default)]
    pub footer: Option<Widget>,
}

impl GlobalWidgets {
    pub fn get(&self, kind: GlobalWidgetKind) -> Option<&Widget> {
        match kind {
            GlobalWidgetKind::Header => self.header.as_ref(),
            GlobalWidgetKind::Footer => self.footer.as_ref(),
        }
    }

    pub fn set(&mut self, kind: GlobalWidgetKind, widget: Option<Widget>) {
        match kind {
            GlobalWidgetKind::Header => self.header = widget,
            GlobalWidgetKind::Footer => self.footer = widget,
        }
    }
}
