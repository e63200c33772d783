//! JSON bodies of the preview HTTP endpoints.
//!
//! Shared by the server handlers and the HTTP render client so both sides
//! agree on field names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::page::{GlobalWidgets, Page};
use crate::theme::ThemeSettings;
use crate::types::WidgetId;
use crate::widget::Widget;

/// Page payload of `POST /preview`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub widgets: BTreeMap<WidgetId, Widget>,
    #[serde(default)]
    pub widgets_order: Vec<WidgetId>,
    /// Overrides the stored header/footer when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_widgets: Option<GlobalWidgets>,
}

impl PageData {
    /// Split into the page proper and any inline global widgets.
    pub fn into_parts(self) -> (Page, Option<GlobalWidgets>) {
        (
            Page {
                name: self.name,
                widgets: self.widgets,
                widgets_order: self.widgets_order,
            },
            self.global_widgets,
        )
    }

    pub fn from_parts(page: Page, global_widgets: Option<GlobalWidgets>) -> Self {
        Self {
            name: page.name,
            widgets: page.widgets,
            widgets_order: page.widgets_order,
            global_widgets,
        }
    }
}

/// Body of `POST /preview`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPageRequest {
    pub page_data: PageData,
    #[serde(default)]
    pub theme_settings: ThemeSettings,
}

/// Body of `POST /preview/widget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreviewWidgetRequest {
    #[validate(length(min = 1, max = 128))]
    pub widget_id: WidgetId,
    pub widget: Widget,
    #[serde(default)]
    pub theme_settings: ThemeSettings,
}

/// Response of `GET /preview/global-widgets`.
pub type GlobalWidgetsResponse = GlobalWidgets;

/// Response of `POST /preview/global-widgets/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGlobalWidgetResponse {
    pub success: bool,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}
