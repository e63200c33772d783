//! Selection and hover overlay drawn in the editor document over the
//! preview frame.
//!
//! The overlay never looks inside the frame. It only keeps the latest
//! iframe-local rectangles reported by the runtime (`ELEMENT_BOUNDS`,
//! `WIDGET_HOVERED`) together with the latest iframe and container
//! rectangles, and translates on every read.

use pagewright_core::geometry::{translate_to_overlay, Rect};
use pagewright_core::protocol::{BoundsPayload, ElementAddress};

/// Last reported iframe-local bounds of one element.
#[derive(Debug, Clone, PartialEq)]
struct TrackedBox {
    address: ElementAddress,
    local: Rect,
    block_local: Option<Rect>,
}

impl From<&BoundsPayload> for TrackedBox {
    fn from(payload: &BoundsPayload) -> Self {
        Self {
            address: payload.address(),
            local: payload.bounds,
            block_local: payload.block_bounds,
        }
    }
}

/// A box ready to draw, in overlay coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    pub address: ElementAddress,
    /// The widget rectangle.
    pub rect: Rect,
    /// The block rectangle, when a block is addressed.
    pub block_rect: Option<Rect>,
}

#[derive(Debug, Default)]
pub struct Overlay {
    iframe_rect: Rect,
    container_rect: Rect,
    selected: Option<ElementAddress>,
    selection: Option<TrackedBox>,
    hover: Option<TrackedBox>,
}

impl Overlay {
    pub fn new(iframe_rect: Rect, container_rect: Rect) -> Self {
        Self {
            iframe_rect,
            container_rect,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> Option<&ElementAddress> {
        self.selected.as_ref()
    }

    /// Track a new selection. The box appears once the frame reports its
    /// bounds.
    pub fn select(&mut self, address: Option<ElementAddress>) {
        if self.selected != address {
            self.selection = None;
        }
        self.selected = address;
    }

    /// `ELEMENT_BOUNDS`. Reports for anything but the current selection
    /// are ignored. Returns whether the report was taken.
    pub fn on_bounds(&mut self, payload: &BoundsPayload) -> bool {
        if self.selected.as_ref() != Some(&payload.address()) {
            return false;
        }
        self.selection = Some(TrackedBox::from(payload));
        true
    }

    /// `WIDGET_HOVERED`, whether the gesture started in the frame or in
    /// the sidebar.
    pub fn on_hover(&mut self, payload: &BoundsPayload) {
        self.hover = Some(TrackedBox::from(payload));
    }

    pub fn clear_hover(&mut self) {
        self.hover = None;
    }

    /// The preview changed size (device mode switch).
    pub fn on_iframe_resize(&mut self, iframe_rect: Rect) {
        self.iframe_rect = iframe_rect;
    }

    pub fn on_container_resize(&mut self, container_rect: Rect) {
        self.container_rect = container_rect;
    }

    /// A new document loaded. Old boxes point into a document that no
    /// longer exists; the selection itself is kept and re-reported by the
    /// new document.
    pub fn on_iframe_load(&mut self, iframe_rect: Rect) {
        self.iframe_rect = iframe_rect;
        self.clear_boxes();
    }

    /// Drop both boxes, keeping the selection.
    pub fn clear_boxes(&mut self) {
        self.selection = None;
        self.hover = None;
    }

    pub fn selection_box(&self) -> Option<OverlayBox> {
        self.selection.as_ref().map(|b| self.translate(b))
    }

    pub fn hover_box(&self) -> Option<OverlayBox> {
        self.hover.as_ref().map(|b| self.translate(b))
    }

    fn translate(&self, tracked: &TrackedBox) -> OverlayBox {
        let place = |local: &Rect| translate_to_overlay(&self.iframe_rect, &self.container_rect, local);
        OverlayBox {
            address: tracked.address.clone(),
            rect: place(&tracked.local),
            block_rect: tracked.block_local.as_ref().map(place),
        }
    }
}
