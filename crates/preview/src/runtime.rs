//! Runtime that lives inside the preview document.
//!
//! It is the only writer of the preview DOM. Editor messages arrive as
//! [`Envelope`]s and are applied to a [`PreviewDom`]; user gestures are
//! resolved to `{widgetId, blockId}` addresses by walking up from the
//! event target, and reported back through a [`FrameEndpoint`].
//!
//! [`MemoryDom`] is a headless DOM with a deterministic stacked layout,
//! used to drive the runtime outside a browser.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use pagewright_core::css_vars::{to_root_css, CssVariables};
use pagewright_core::fonts::{google_font_url, FontRequests};
use pagewright_core::geometry::Rect;
use pagewright_core::page::MoveDirection;
use pagewright_core::protocol::{
    BoundsPayload, ElementAddress, ParentMessage, PreviewMessage, ReorderPayload,
};
use pagewright_core::types::{BlockId, WidgetId};

use crate::error::PreviewError;
use crate::transport::{Envelope, FrameEndpoint};

/// The operations the runtime needs from a document.
pub trait PreviewDom {
    /// Event target handle.
    type Node;

    /// Replace the subtree of `[data-widget-id=widget_id]` with `html`.
    /// Returns `false` when no such element exists.
    fn replace_widget(&mut self, widget_id: &str, html: &str) -> bool;

    /// Replace the custom properties set on the document root.
    fn set_root_properties(&mut self, variables: &CssVariables);

    fn load_stylesheet(&mut self, href: &str);

    /// Viewport-relative rectangles of the addressed widget and, when a
    /// block is addressed, of that block.
    fn bounds(&self, address: &ElementAddress) -> Option<(Rect, Option<Rect>)>;

    /// Scroll the addressed element into view. Returns `false` when it
    /// does not exist.
    fn scroll_into_view(&mut self, address: &ElementAddress) -> bool;

    /// Address of the nearest ancestor (or self) carrying
    /// `data-widget-id`, with the nearest `data-block-id` on the way.
    fn closest_address(&self, node: &Self::Node) -> Option<ElementAddress>;
}

/// Applies editor messages to the document and reports gestures.
pub struct PreviewRuntime<D: PreviewDom> {
    dom: D,
    endpoint: FrameEndpoint,
    selected: Option<ElementAddress>,
    loaded_fonts: BTreeSet<(String, u16)>,
    started: bool,
}

impl<D: PreviewDom> PreviewRuntime<D> {
    pub fn new(dom: D, endpoint: FrameEndpoint) -> Self {
        Self {
            dom,
            endpoint,
            selected: None,
            loaded_fonts: BTreeSet::new(),
            started: false,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// For simulating user scroll or viewport changes; follow up with
    /// [`Self::on_viewport_change`].
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn generation(&self) -> u64 {
        self.endpoint.generation()
    }

    pub fn selected(&self) -> Option<&ElementAddress> {
        self.selected.as_ref()
    }

    /// Announce readiness. Sent once per document.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.endpoint.post(&PreviewMessage::PreviewReady);
    }

    /// Apply one message from the editor. Never fails: stale and
    /// malformed messages are logged and dropped.
    pub fn handle(&mut self, envelope: Envelope) {
        if envelope.generation != self.generation() {
            let err = PreviewError::StaleGeneration {
                got: envelope.generation,
                current: self.generation(),
            };
            tracing::debug!(error = %err, "Ignoring editor message");
            return;
        }
        match ParentMessage::decode(&envelope.message) {
            Ok(message) => self.apply(message),
            Err(e) => {
                let err = PreviewError::from(e);
                tracing::warn!(error = %err, "Dropping malformed editor message");
            }
        }
    }

    fn apply(&mut self, message: ParentMessage) {
        match message {
            ParentMessage::MorphWidget(payload) => {
                if !self.dom.replace_widget(&payload.widget_id, &payload.html) {
                    tracing::debug!(widget_id = %payload.widget_id, "Morph target not in document");
                    return;
                }
                // The selected element may have moved or resized.
                if self
                    .selected
                    .as_ref()
                    .is_some_and(|s| s.widget_id == payload.widget_id)
                {
                    self.report_selection();
                }
            }
            ParentMessage::UpdateCssVariables(payload) => {
                self.dom.set_root_properties(&payload.variables);
                self.report_selection();
            }
            ParentMessage::LoadFonts(requests) => self.load_fonts(&requests),
            ParentMessage::UpdateSelection(payload) => {
                self.selected = payload
                    .address()
                    .filter(|address| self.dom.bounds(address).is_some());
                self.report_selection();
            }
            ParentMessage::ScrollToElement(address) => {
                if self.dom.scroll_into_view(&address) {
                    self.report_bounds(&address, PreviewMessage::ElementBounds);
                } else {
                    tracing::debug!(widget_id = %address.widget_id, "Scroll target not in document");
                }
            }
            ParentMessage::SidebarHover(payload) => {
                if let Some(address) = payload.address() {
                    self.report_bounds(&address, PreviewMessage::WidgetHovered);
                }
            }
        }
    }

    fn load_fonts(&mut self, requests: &FontRequests) {
        for (family, weights) in requests {
            for weight in weights {
                if self.loaded_fonts.insert((family.clone(), *weight)) {
                    self.dom.load_stylesheet(&google_font_url(family, *weight));
                }
            }
        }
    }

    fn report_selection(&self) {
        if let Some(address) = &self.selected {
            self.report_bounds(address, PreviewMessage::ElementBounds);
        }
    }

    fn report_bounds(&self, address: &ElementAddress, wrap: fn(BoundsPayload) -> PreviewMessage) {
        let Some((bounds, block_bounds)) = self.dom.bounds(address) else {
            return;
        };
        self.endpoint.post(&wrap(BoundsPayload {
            widget_id: address.widget_id.clone(),
            block_id: address.block_id.clone(),
            bounds,
            block_bounds,
        }));
    }

    // ---- delegated gestures ----

    /// Click anywhere in the document.
    pub fn on_click(&mut self, target: &D::Node) {
        if let Some(address) = self.dom.closest_address(target) {
            self.endpoint.post(&PreviewMessage::WidgetSelected(address));
        }
    }

    pub fn on_mouseover(&mut self, target: &D::Node) {
        if let Some(address) = self.dom.closest_address(target) {
            self.report_bounds(&address, PreviewMessage::WidgetHovered);
        }
    }

    /// Document scroll or viewport resize: bounds of the selection moved.
    pub fn on_viewport_change(&mut self) {
        self.report_selection();
    }

    /// In-preview move up/down control.
    pub fn request_reorder(&mut self, widget_id: &str, direction: MoveDirection) {
        self.endpoint
            .post(&PreviewMessage::ReorderWidget(ReorderPayload {
                widget_id: widget_id.to_string(),
                direction,
            }));
    }
}

// ---------------------------------------------------------------------------
// In-memory DOM
// ---------------------------------------------------------------------------

/// Height of a widget without blocks.
const WIDGET_BASE_HEIGHT: f64 = 120.0;
/// Height added per block, which stack below the widget base.
const BLOCK_HEIGHT: f64 = 80.0;

/// Event targets in a [`MemoryDom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNode {
    Body,
    Widget(WidgetId),
    Block { widget_id: WidgetId, block_id: BlockId },
    /// Some element inside a widget (or block) without its own address.
    Content {
        widget_id: WidgetId,
        block_id: Option<BlockId>,
    },
}

#[derive(Debug, Clone)]
struct MemoryWidget {
    id: WidgetId,
    html: String,
    blocks: Vec<BlockId>,
}

impl MemoryWidget {
    fn height(&self) -> f64 {
        WIDGET_BASE_HEIGHT + BLOCK_HEIGHT * self.blocks.len() as f64
    }
}

/// Headless document: widget sections in document order, laid out top
/// to bottom at full viewport width.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    viewport: Rect,
    widgets: Vec<MemoryWidget>,
    theme_css: String,
    root_properties: Option<CssVariables>,
    stylesheets: Vec<String>,
    scroll_y: f64,
}

fn section_tag_pattern() -> &'static Regex {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    SECTION.get_or_init(|| Regex::new(r"<(/?)section\b([^>]*)>").expect("valid regex"))
}

fn widget_id_pattern() -> &'static Regex {
    static WIDGET_ID: OnceLock<Regex> = OnceLock::new();
    WIDGET_ID.get_or_init(|| Regex::new(r#"\bdata-widget-id="([^"]*)""#).expect("valid regex"))
}

fn block_pattern() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r#"\bdata-block-id="([^"]*)""#).expect("valid regex"))
}

fn theme_style_pattern() -> &'static Regex {
    static STYLE: OnceLock<Regex> = OnceLock::new();
    STYLE.get_or_init(|| {
        Regex::new(r#"(?s)<style id="theme-variables">(.*?)</style>"#).expect("valid regex")
    })
}

/// Top-level widget sections. A section opens at a tag carrying
/// `data-widget-id` and closes at its matching `</section>`, so sections
/// nested inside widget markup stay part of their widget. Unclosed
/// sections are dropped.
fn parse_sections(html: &str) -> Vec<MemoryWidget> {
    let mut widgets = Vec::new();
    let mut open: Option<(usize, WidgetId)> = None;
    let mut depth = 0usize;

    for caps in section_tag_pattern().captures_iter(html) {
        let Some(tag) = caps.get(0) else { continue };
        let closing = &caps[1] == "/";

        if open.is_none() {
            if !closing {
                if let Some(id) = widget_id_pattern().captures(&caps[2]) {
                    open = Some((tag.start(), id[1].to_string()));
                    depth = 1;
                }
            }
            continue;
        }

        if !closing {
            depth += 1;
            continue;
        }
        depth -= 1;
        if depth == 0 {
            if let Some((start, id)) = open.take() {
                let whole = &html[start..tag.end()];
                widgets.push(MemoryWidget {
                    id,
                    html: whole.to_string(),
                    blocks: block_pattern()
                        .captures_iter(whole)
                        .map(|b| b[1].to_string())
                        .collect(),
                });
            }
        }
    }
    widgets
}

impl MemoryDom {
    /// Parse a full preview document. `viewport` is the iframe size; its
    /// position is ignored.
    pub fn load(html: &str, viewport: Rect) -> Self {
        let theme_css = theme_style_pattern()
            .captures(html)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        Self {
            viewport,
            widgets: parse_sections(html),
            theme_css,
            root_properties: None,
            stylesheets: Vec::new(),
            scroll_y: 0.0,
        }
    }

    /// Widget ids in document order.
    pub fn widget_ids(&self) -> Vec<&str> {
        self.widgets.iter().map(|w| w.id.as_str()).collect()
    }

    pub fn widget_html(&self, widget_id: &str) -> Option<&str> {
        self.find(widget_id).map(|w| w.html.as_str())
    }

    /// The `:root` rule currently in effect: the inline theme style of the
    /// loaded document until the editor pushes variables.
    pub fn root_css(&self) -> String {
        match &self.root_properties {
            Some(vars) => to_root_css(vars),
            None => self.theme_css.clone(),
        }
    }

    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    /// User scroll.
    pub fn scroll_to(&mut self, y: f64) {
        self.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.scroll_y = self.scroll_y.min(self.max_scroll());
    }

    fn find(&self, widget_id: &str) -> Option<&MemoryWidget> {
        self.widgets.iter().find(|w| w.id == widget_id)
    }

    fn document_height(&self) -> f64 {
        self.widgets.iter().map(MemoryWidget::height).sum()
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height() - self.viewport.height).max(0.0)
    }

    /// Document-relative rectangles of the addressed widget and block.
    fn layout(&self, address: &ElementAddress) -> Option<(Rect, Option<Rect>)> {
        let mut top = 0.0;
        for widget in &self.widgets {
            if widget.id == address.widget_id {
                let rect = Rect::new(top, 0.0, self.viewport.width, widget.height());
                let block = match &address.block_id {
                    None => None,
                    Some(block_id) => {
                        let index = widget.blocks.iter().position(|b| b == block_id)?;
                        Some(Rect::new(
                            top + WIDGET_BASE_HEIGHT + BLOCK_HEIGHT * index as f64,
                            0.0,
                            self.viewport.width,
                            BLOCK_HEIGHT,
                        ))
                    }
                };
                return Some((rect, block));
            }
            top += widget.height();
        }
        None
    }
}

impl PreviewDom for MemoryDom {
    type Node = MemoryNode;

    fn replace_widget(&mut self, widget_id: &str, html: &str) -> bool {
        let Some(index) = self.widgets.iter().position(|w| w.id == widget_id) else {
            return false;
        };
        let mut replacement = parse_sections(html);
        if replacement.len() != 1 || replacement[0].id != widget_id {
            tracing::warn!(widget_id = %widget_id, "Morph HTML does not carry the target address");
            return false;
        }
        self.widgets[index] = replacement.remove(0);
        true
    }

    fn set_root_properties(&mut self, variables: &CssVariables) {
        self.root_properties = Some(variables.clone());
    }

    fn load_stylesheet(&mut self, href: &str) {
        self.stylesheets.push(href.to_string());
    }

    fn bounds(&self, address: &ElementAddress) -> Option<(Rect, Option<Rect>)> {
        let (rect, block) = self.layout(address)?;
        let dy = -self.scroll_y;
        Some((rect.offset(dy, 0.0), block.map(|b| b.offset(dy, 0.0))))
    }

    fn scroll_into_view(&mut self, address: &ElementAddress) -> bool {
        let Some((rect, block)) = self.layout(address) else {
            return false;
        };
        let target = block.unwrap_or(rect);
        self.scroll_to(target.top);
        true
    }

    fn closest_address(&self, node: &MemoryNode) -> Option<ElementAddress> {
        let (widget_id, block_id) = match node {
            MemoryNode::Body => return None,
            MemoryNode::Widget(widget_id) => (widget_id, None),
            MemoryNode::Block { widget_id, block_id } => (widget_id, Some(block_id)),
            MemoryNode::Content { widget_id, block_id } => (widget_id, block_id.as_ref()),
        };
        // Nodes of a replaced widget no longer exist in the document.
        let widget = self.find(widget_id)?;
        let block_id = block_id.filter(|b| widget.blocks.contains(*b)).cloned();
        Some(ElementAddress {
            widget_id: widget_id.clone(),
            block_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::protocol::{MorphWidgetPayload, SelectionPayload};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    const DOC: &str = concat!(
        "<html><head><style id=\"theme-variables\">:root {\n}</style></head><body>",
        "<section class=\"widget\" data-widget-id=\"hero\" data-widget-type=\"hero\"><h1>A</h1></section>",
        "<section class=\"widget\" data-widget-id=\"gallery\" data-widget-type=\"gallery\">",
        "<div class=\"block\" data-block-id=\"b1\"></div><div class=\"block\" data-block-id=\"b2\"></div>",
        "</section></body></html>",
    );

    fn runtime() -> (PreviewRuntime<MemoryDom>, UnboundedReceiver<Envelope>) {
        let (endpoint, rx) = FrameEndpoint::channel(3);
        let dom = MemoryDom::load(DOC, Rect::new(0.0, 0.0, 1000.0, 300.0));
        (PreviewRuntime::new(dom, endpoint), rx)
    }

    fn envelope(generation: u64, message: ParentMessage) -> Envelope {
        Envelope {
            generation,
            message: message.encode().unwrap(),
        }
    }

    fn next(rx: &mut UnboundedReceiver<Envelope>) -> PreviewMessage {
        PreviewMessage::decode(&rx.try_recv().unwrap().message).unwrap()
    }

    #[test]
    fn memory_dom_parses_sections_and_blocks() {
        let dom = MemoryDom::load(DOC, Rect::new(0.0, 0.0, 1000.0, 300.0));
        assert_eq!(dom.widget_ids(), vec!["hero", "gallery"]);
        let (gallery, block) = dom.bounds(&ElementAddress::block("gallery", "b2")).unwrap();
        assert_eq!(gallery, Rect::new(120.0, 0.0, 1000.0, 280.0));
        assert_eq!(block, Some(Rect::new(320.0, 0.0, 1000.0, 80.0)));
        assert_eq!(dom.root_css(), ":root {\n}");
    }

    #[test]
    fn memory_dom_keeps_nested_sections_inside_their_widget() {
        let doc = concat!(
            "<body><section data-widget-id=\"hero\"><section class=\"inner\"><p>x</p></section>",
            "<div data-block-id=\"b1\"></div></section>",
            "<section data-widget-id=\"footer\"><p>f</p></section></body>",
        );
        let dom = MemoryDom::load(doc, Rect::new(0.0, 0.0, 1000.0, 300.0));
        assert_eq!(dom.widget_ids(), vec!["hero", "footer"]);
        let hero = dom.widget_html("hero").unwrap();
        assert!(hero.contains("data-block-id=\"b1\""));
        assert!(hero.ends_with("</div></section>"));
        assert!(dom.bounds(&ElementAddress::block("hero", "b1")).is_some());
    }

    #[test]
    fn morph_replaces_only_the_target() {
        let (mut runtime, _rx) = runtime();
        let html = "<section data-widget-id=\"hero\"><h1>B</h1></section>";
        runtime.handle(envelope(
            3,
            ParentMessage::MorphWidget(MorphWidgetPayload {
                widget_id: "hero".into(),
                html: html.into(),
            }),
        ));
        assert_eq!(runtime.dom().widget_html("hero"), Some(html));
        assert!(runtime.dom().widget_html("gallery").unwrap().contains("b2"));
    }

    #[test]
    fn morph_for_missing_widget_or_stale_generation_is_a_no_op() {
        let (mut runtime, mut rx) = runtime();
        let before = runtime.dom().clone();
        runtime.handle(envelope(
            3,
            ParentMessage::MorphWidget(MorphWidgetPayload {
                widget_id: "removed".into(),
                html: "<section data-widget-id=\"removed\"></section>".into(),
            }),
        ));
        runtime.handle(envelope(
            2,
            ParentMessage::MorphWidget(MorphWidgetPayload {
                widget_id: "hero".into(),
                html: "<section data-widget-id=\"hero\">stale</section>".into(),
            }),
        ));
        assert_eq!(runtime.dom().widget_html("hero"), before.widget_html("hero"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_messages_are_dropped() {
        let (mut runtime, mut rx) = runtime();
        runtime.handle(Envelope {
            generation: 3,
            message: json!({ "type": "MORPH_WIDGET", "payload": { "widgetId": 5 } }),
        });
        runtime.handle(Envelope {
            generation: 3,
            message: json!("garbage"),
        });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fonts_are_requested_once_per_pair() {
        let (mut runtime, _rx) = runtime();
        let requests: FontRequests = serde_json::from_value(json!({ "Lora": [400, 700] })).unwrap();
        runtime.handle(envelope(3, ParentMessage::LoadFonts(requests.clone())));
        runtime.handle(envelope(3, ParentMessage::LoadFonts(requests)));
        assert_eq!(runtime.dom().stylesheets().len(), 2);
    }

    #[test]
    fn selection_reports_bounds_and_follows_scroll() {
        let (mut runtime, mut rx) = runtime();
        runtime.handle(envelope(
            3,
            ParentMessage::UpdateSelection(SelectionPayload::from(Some(ElementAddress::widget(
                "gallery",
            )))),
        ));
        let first = next(&mut rx);
        assert!(matches!(first, PreviewMessage::ElementBounds(ref b) if b.bounds.top == 120.0));

        runtime.dom_mut().scroll_to(100.0);
        runtime.on_viewport_change();
        let second = next(&mut rx);
        assert!(matches!(second, PreviewMessage::ElementBounds(ref b) if b.bounds.top == 20.0));
    }

    #[test]
    fn selecting_a_missing_widget_clears_selection_silently() {
        let (mut runtime, mut rx) = runtime();
        runtime.handle(envelope(
            3,
            ParentMessage::UpdateSelection(SelectionPayload::from(Some(ElementAddress::widget(
                "missing",
            )))),
        ));
        assert!(runtime.selected().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn click_walks_up_to_the_nearest_address() {
        let (mut runtime, mut rx) = runtime();
        runtime.on_click(&MemoryNode::Content {
            widget_id: "gallery".into(),
            block_id: Some("b1".into()),
        });
        assert_eq!(
            next(&mut rx),
            PreviewMessage::WidgetSelected(ElementAddress::block("gallery", "b1"))
        );
        runtime.on_click(&MemoryNode::Body);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sidebar_hover_is_answered_with_widget_hovered() {
        let (mut runtime, mut rx) = runtime();
        runtime.handle(envelope(
            3,
            ParentMessage::SidebarHover(SelectionPayload::from(Some(ElementAddress::widget("hero")))),
        ));
        assert!(matches!(next(&mut rx), PreviewMessage::WidgetHovered(ref b) if b.widget_id == "hero"));
    }

    #[test]
    fn scroll_to_element_moves_viewport_and_reports() {
        let (mut runtime, mut rx) = runtime();
        runtime.handle(envelope(3, ParentMessage::ScrollToElement(ElementAddress::widget("gallery"))));
        assert_eq!(runtime.dom().scroll_y(), 100.0);
        assert!(matches!(next(&mut rx), PreviewMessage::ElementBounds(ref b) if b.bounds.top == 20.0));
    }
}
