//! Snapshot diffing for live preview.
//!
//! Two questions are asked of every `(previous, current)` snapshot pair,
//! always in this order:
//!
//! 1. [`detect_structural_change`]: did the set, order or type of widgets
//!    change, or was a global widget swapped? If so the preview reloads.
//! 2. [`compute_content_diff`]: otherwise, which widgets need a morph and
//!    did the theme change?
//!
//! Keeping both checks here gives every caller the same definition of
//! "structural".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::page::GlobalWidgetKind;
use crate::snapshot::EditorSnapshot;
use crate::types::WidgetId;
use crate::widget::Widget;

/// The status of an item in a diff comparison.
///
/// - `Added`     -- present only in the new snapshot.
/// - `Removed`   -- present only in the old snapshot.
/// - `Changed`   -- present in both with different content.
/// - `Unchanged` -- present in both with identical content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare one widget across two snapshots by content: settings, blocks
/// and block order. Block order is compared positionally.
pub fn widget_status(old: Option<&Widget>, new: Option<&Widget>) -> DiffStatus {
    match (old, new) {
        (None, None) => DiffStatus::Unchanged,
        (None, Some(_)) => DiffStatus::Added,
        (Some(_), None) => DiffStatus::Removed,
        (Some(a), Some(b)) => {
            if a.settings != b.settings || a.blocks != b.blocks || a.blocks_order != b.blocks_order
            {
                DiffStatus::Changed
            } else {
                DiffStatus::Unchanged
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Structural changes
// ---------------------------------------------------------------------------

/// A change that can only be shown by reloading the whole preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralChange {
    WidgetsAdded(Vec<WidgetId>),
    WidgetsRemoved(Vec<WidgetId>),
    WidgetsReordered,
    WidgetTypeChanged(WidgetId),
    /// A header/footer appeared, disappeared or changed type.
    GlobalWidgetSwapped(GlobalWidgetKind),
}

impl StructuralChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WidgetsAdded(_) => "widgets_added",
            Self::WidgetsRemoved(_) => "widgets_removed",
            Self::WidgetsReordered => "widgets_reordered",
            Self::WidgetTypeChanged(_) => "widget_type_changed",
            Self::GlobalWidgetSwapped(_) => "global_widget_swapped",
        }
    }
}

impl std::fmt::Display for StructuralChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single structural-change test: widget-id membership, widget order,
/// widget type, and global widget presence/type.
pub fn detect_structural_change(
    old: &EditorSnapshot,
    new: &EditorSnapshot,
) -> Option<StructuralChange> {
    let old_ids: BTreeSet<&WidgetId> = old.widgets.keys().collect();
    let new_ids: BTreeSet<&WidgetId> = new.widgets.keys().collect();

    let removed: Vec<WidgetId> = old_ids.difference(&new_ids).map(|id| (*id).clone()).collect();
    if !removed.is_empty() {
        return Some(StructuralChange::WidgetsRemoved(removed));
    }
    let added: Vec<WidgetId> = new_ids.difference(&old_ids).map(|id| (*id).clone()).collect();
    if !added.is_empty() {
        return Some(StructuralChange::WidgetsAdded(added));
    }
    if old.widgets_order != new.widgets_order {
        return Some(StructuralChange::WidgetsReordered);
    }
    for (id, widget) in &new.widgets {
        if old
            .widgets
            .get(id)
            .is_some_and(|prev| prev.widget_type != widget.widget_type)
        {
            return Some(StructuralChange::WidgetTypeChanged(id.clone()));
        }
    }
    for kind in [GlobalWidgetKind::Header, GlobalWidgetKind::Footer] {
        let before = old.global_widgets.get(kind).map(|w| &w.widget_type);
        let after = new.global_widgets.get(kind).map(|w| &w.widget_type);
        if before != after {
            return Some(StructuralChange::GlobalWidgetSwapped(kind));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Content changes
// ---------------------------------------------------------------------------

/// What a content-only reconciliation pass has to update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDiff {
    /// Page widgets whose content changed, in `widgetsOrder` order.
    pub changed_widget_ids: Vec<WidgetId>,
    pub header_changed: bool,
    pub footer_changed: bool,
    pub theme_changed: bool,
}

impl ContentDiff {
    pub fn is_empty(&self) -> bool {
        self.changed_widget_ids.is_empty()
            && !self.header_changed
            && !self.footer_changed
            && !self.theme_changed
    }

    /// Every widget id that needs a morph, globals included.
    pub fn morph_targets(&self) -> Vec<WidgetId> {
        let mut targets = Vec::with_capacity(self.changed_widget_ids.len() + 2);
        if self.header_changed {
            targets.push(GlobalWidgetKind::Header.as_str().to_string());
        }
        targets.extend(self.changed_widget_ids.iter().cloned());
        if self.footer_changed {
            targets.push(GlobalWidgetKind::Footer.as_str().to_string());
        }
        targets
    }
}

/// Content-level diff between two snapshots.
///
/// Only meaningful when [`detect_structural_change`] returned `None` for
/// the same pair; widgets present on one side only are ignored here.
pub fn compute_content_diff(old: &EditorSnapshot, new: &EditorSnapshot) -> ContentDiff {
    let changed_widget_ids = new
        .widgets_order
        .iter()
        .filter(|id| {
            widget_status(old.widgets.get(*id), new.widgets.get(*id)) == DiffStatus::Changed
        })
        .cloned()
        .collect();

    let global_changed = |kind| {
        widget_status(old.global_widgets.get(kind), new.global_widgets.get(kind))
            == DiffStatus::Changed
    };

    ContentDiff {
        changed_widget_ids,
        header_changed: global_changed(GlobalWidgetKind::Header),
        footer_changed: global_changed(GlobalWidgetKind::Footer),
        theme_changed: old.theme_settings != new.theme_settings,
    }
}
