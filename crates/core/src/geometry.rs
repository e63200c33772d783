//! Rectangles and the single overlay coordinate translation.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in CSS pixels.
///
/// Mirrors the fields of a DOMRect that matter for positioning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Shift by a vertical/horizontal offset.
    pub fn offset(&self, dy: f64, dx: f64) -> Self {
        Self {
            top: self.top + dy,
            left: self.left + dx,
            ..*self
        }
    }

    pub fn contains_point(&self, y: f64, x: f64) -> bool {
        y >= self.top && y < self.bottom() && x >= self.left && x < self.right()
    }
}

/// Translate an iframe-local element rectangle into overlay coordinates.
///
/// `overlay = iframe - overlay_container + element_local`, applied to the
/// top/left corner. Width and height are unchanged. Callers recompute
/// this on every read from the latest rectangles instead of caching a
/// translated value.
pub fn translate_to_overlay(iframe: &Rect, overlay: &Rect, element_local: &Rect) -> Rect {
    Rect {
        top: iframe.top - overlay.top + element_local.top,
        left: iframe.left - overlay.left + element_local.left,
        width: element_local.width,
        height: element_local.height,
    }
}
