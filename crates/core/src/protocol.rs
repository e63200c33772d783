//! Preview message protocol.
//!
//! Every message crossing the iframe boundary has the shape
//! `{"type": "<KIND>", "payload": {...}}`. Elements are addressed by
//! `{widgetId, blockId?}` only, never by node reference or index, because
//! the preview DOM is rewritten by morphs and reloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::css_vars::CssVariables;
use crate::fonts::FontRequests;
use crate::geometry::Rect;
use crate::page::MoveDirection;
use crate::types::{BlockId, WidgetId};

/// A message that could not be decoded or encoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed preview message: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Address of a widget, or of a block inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ElementAddress {
    pub widget_id: WidgetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub block_id: Option<BlockId>,
}

impl ElementAddress {
    pub fn widget(widget_id: impl Into<WidgetId>) -> Self {
        Self {
            widget_id: widget_id.into(),
            block_id: None,
        }
    }

    pub fn block(widget_id: impl Into<WidgetId>, block_id: impl Into<BlockId>) -> Self {
        Self {
            widget_id: widget_id.into(),
            block_id: Some(block_id.into()),
        }
    }
}

/// Payload of `MORPH_WIDGET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MorphWidgetPayload {
    pub widget_id: WidgetId,
    pub html: String,
}

/// Payload of `UPDATE_CSS_VARIABLES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CssVariablesPayload {
    pub variables: CssVariables,
}

/// Payload of `UPDATE_SELECTION` and `SIDEBAR_HOVER`. A `null` widget id
/// clears the selection or hover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SelectionPayload {
    pub widget_id: Option<WidgetId>,
    #[serde(default)]
    pub block_id: Option<BlockId>,
}

impl SelectionPayload {
    pub fn address(&self) -> Option<ElementAddress> {
        self.widget_id.as_ref().map(|widget_id| ElementAddress {
            widget_id: widget_id.clone(),
            block_id: self.block_id.clone(),
        })
    }
}

impl From<Option<ElementAddress>> for SelectionPayload {
    fn from(address: Option<ElementAddress>) -> Self {
        match address {
            Some(a) => Self {
                widget_id: Some(a.widget_id),
                block_id: a.block_id,
            },
            None => Self::default(),
        }
    }
}

/// Payload of `ELEMENT_BOUNDS` and `WIDGET_HOVERED`. Rectangles are in
/// iframe-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BoundsPayload {
    pub widget_id: WidgetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub block_id: Option<BlockId>,
    pub bounds: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub block_bounds: Option<Rect>,
}

impl BoundsPayload {
    pub fn address(&self) -> ElementAddress {
        ElementAddress {
            widget_id: self.widget_id.clone(),
            block_id: self.block_id.clone(),
        }
    }
}

/// Payload of `REORDER_WIDGET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReorderPayload {
    pub widget_id: WidgetId,
    pub direction: MoveDirection,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Parent (editor) → iframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ParentMessage {
    /// Replace the subtree rooted at `[data-widget-id]` with new HTML.
    MorphWidget(MorphWidgetPayload),
    /// Apply custom properties to the document root.
    UpdateCssVariables(CssVariablesPayload),
    /// Ensure web fonts for the given family/weight pairs are loaded.
    LoadFonts(FontRequests),
    UpdateSelection(SelectionPayload),
    ScrollToElement(ElementAddress),
    /// Hover originating from the editor sidebar.
    SidebarHover(SelectionPayload),
}

impl ParentMessage {
    /// Wire name of the message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MorphWidget(_) => "MORPH_WIDGET",
            Self::UpdateCssVariables(_) => "UPDATE_CSS_VARIABLES",
            Self::LoadFonts(_) => "LOAD_FONTS",
            Self::UpdateSelection(_) => "UPDATE_SELECTION",
            Self::ScrollToElement(_) => "SCROLL_TO_ELEMENT",
            Self::SidebarHover(_) => "SIDEBAR_HOVER",
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        decode(value)
    }

    pub fn encode(&self) -> Result<Value, ProtocolError> {
        encode(self)
    }
}

/// Iframe → parent (editor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PreviewMessage {
    /// Runtime initialised; sent once per loaded document.
    PreviewReady,
    ElementBounds(BoundsPayload),
    WidgetSelected(ElementAddress),
    WidgetHovered(BoundsPayload),
    ReorderWidget(ReorderPayload),
}

impl PreviewMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreviewReady => "PREVIEW_READY",
            Self::ElementBounds(_) => "ELEMENT_BOUNDS",
            Self::WidgetSelected(_) => "WIDGET_SELECTED",
            Self::WidgetHovered(_) => "WIDGET_HOVERED",
            Self::ReorderWidget(_) => "REORDER_WIDGET",
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        decode(value)
    }

    pub fn encode(&self) -> Result<Value, ProtocolError> {
        encode(self)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, ProtocolError> {
    if !value.get("type").is_some_and(Value::is_string) {
        return Err(ProtocolError::Malformed(
            "missing string 'type' discriminator".to_string(),
        ));
    }
    T::deserialize(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

fn encode<T: Serialize>(message: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(message).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
