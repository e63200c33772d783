//! Immutable captures of editor state used for diffing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::page::{GlobalWidgetKind, GlobalWidgets, Page};
use crate::protocol::ElementAddress;
use crate::theme::ThemeSettings;
use crate::types::WidgetId;
use crate::widget::Widget;

/// Current editor selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub widget_id: Option<WidgetId>,
    pub block_id: Option<String>,
}

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn widget(widget_id: impl Into<WidgetId>) -> Self {
        Self {
            widget_id: Some(widget_id.into()),
            block_id: None,
        }
    }

    pub fn block(widget_id: impl Into<WidgetId>, block_id: impl Into<String>) -> Self {
        Self {
            widget_id: Some(widget_id.into()),
            block_id: Some(block_id.into()),
        }
    }

    pub fn address(&self) -> Option<ElementAddress> {
        self.widget_id.as_ref().map(|widget_id| ElementAddress {
            widget_id: widget_id.clone(),
            block_id: self.block_id.clone(),
        })
    }
}

/// Editor state at one point in time.
///
/// Snapshots are values: the editor builds a new one for every change and
/// the preview layer only ever reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    /// Page name, rendered as the document title on every load. Not
    /// diffed: the title is picked up by the next reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(default)]
    pub widgets: BTreeMap<WidgetId, Widget>,
    #[serde(default)]
    pub widgets_order: Vec<WidgetId>,
    #[serde(default)]
    pub global_widgets: GlobalWidgets,
    #[serde(default)]
    pub theme_settings: ThemeSettings,
    #[serde(default)]
    pub selection: Selection,
}

impl EditorSnapshot {
    pub fn new(page: Page, global_widgets: GlobalWidgets, theme_settings: ThemeSettings) -> Self {
        Self {
            page_name: page.name,
            widgets: page.widgets,
            widgets_order: page.widgets_order,
            global_widgets,
            theme_settings,
            selection: Selection::none(),
        }
    }

    /// The page part of the snapshot.
    pub fn page(&self) -> Page {
        Page {
            name: self.page_name.clone(),
            widgets: self.widgets.clone(),
            widgets_order: self.widgets_order.clone(),
        }
    }

    /// Look up a widget by id, including the reserved global ids.
    pub fn widget(&self, widget_id: &str) -> Option<&Widget> {
        match widget_id.parse::<GlobalWidgetKind>() {
            Ok(kind) => self.global_widgets.get(kind),
            Err(_) => self.widgets.get(widget_id),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_lookup_covers_globals() {
        let mut page = Page::default();
        page.insert_widget("hero".into(), Widget::new("hero"), None)
            .unwrap();
        let globals = GlobalWidgets {
            header: Some(Widget::new("header")),
            footer: None,
        };
        let snapshot = EditorSnapshot::new(page, globals, ThemeSettings::new());
        assert_eq!(snapshot.widget("hero").unwrap().widget_type, "hero");
        assert_eq!(snapshot.widget("header").unwrap().widget_type, "header");
        assert!(snapshot.widget("footer").is_none());
        assert_eq!(snapshot.page().widgets_order, vec!["hero"]);
    }

    #[test]
    fn page_name_survives_round_trip_through_snapshot() {
        let page = Page {
            name: Some("About us".into()),
            ..Page::default()
        };
        let snapshot = EditorSnapshot::new(page, GlobalWidgets::default(), ThemeSettings::new());
        assert_eq!(snapshot.page().name.as_deref(), Some("About us"));
    }

    #[test]
    fn selection_address() {
        assert!(Selection::none().address().is_none());
        assert_eq!(
            Selection::block("hero", "b1").address(),
            Some(ElementAddress::block("hero", "b1"))
        );
    }
}
