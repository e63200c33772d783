//! Full-document page renderer.
//!
//! Used for the initial preview load and for reloads after a structural
//! change. Settings-level edits go through single-widget renders instead.

use pagewright_core::css_vars::to_root_css;
use pagewright_core::fonts::{collect_google_fonts, google_fonts_url};
use pagewright_core::media::MediaResolver;
use pagewright_core::page::{GlobalWidgetKind, GlobalWidgets, Page};
use pagewright_core::theme::ThemeSettings;
use pagewright_core::widget::Widget;

use crate::html::HtmlWriter;
use crate::widget::{RenderContext, WidgetRenderer};

/// Id of the `<style>` element holding the theme variables.
pub const THEME_STYLE_ID: &str = "theme-variables";

/// Document-level options.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Script injected at the end of `<body>` (the in-iframe runtime).
    pub runtime_script: Option<String>,
    pub lang: String,
    /// Title used when the page has no name.
    pub default_title: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            runtime_script: None,
            lang: "en".to_string(),
            default_title: "Preview".to_string(),
        }
    }
}

/// Renders complete preview documents.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    widgets: WidgetRenderer,
    options: PageOptions,
}

impl PageRenderer {
    pub fn new(widgets: WidgetRenderer, options: PageOptions) -> Self {
        Self { widgets, options }
    }

    pub fn widget_renderer(&self) -> &WidgetRenderer {
        &self.widgets
    }

    /// Render `header`, the page widgets in `widgets_order`, then `footer`.
    ///
    /// A widget that fails to render is replaced by an addressable
    /// placeholder; the document itself always renders.
    pub fn render_page(
        &self,
        page: &Page,
        globals: &GlobalWidgets,
        theme: &ThemeSettings,
        media: MediaResolver,
    ) -> String {
        let ctx = RenderContext::new(theme, media);
        let mut w = HtmlWriter::with_capacity(8192);

        w.fragment("<!DOCTYPE html>").newline();
        w.open("html", &[("lang", self.options.lang.as_str())]).newline();
        self.write_head(&mut w, page, theme, &ctx);

        w.open("body", &[]).newline();
        if let Some(header) = globals.get(GlobalWidgetKind::Header) {
            self.write_widget(&mut w, GlobalWidgetKind::Header.as_str(), header, &ctx);
        }
        w.open("main", &[("data-page-body", "")]).newline();
        for (widget_id, widget) in page.ordered_widgets() {
            self.write_widget(&mut w, widget_id, widget, &ctx);
        }
        w.close("main").newline();
        if let Some(footer) = globals.get(GlobalWidgetKind::Footer) {
            self.write_widget(&mut w, GlobalWidgetKind::Footer.as_str(), footer, &ctx);
        }
        if let Some(src) = &self.options.runtime_script {
            w.open("script", &[("src", src.as_str()), ("data-preview-runtime", "")])
                .close("script")
                .newline();
        }
        w.close("body").newline();
        w.close("html");

        tracing::debug!(
            widgets = page.widgets_order.len(),
            bytes = w.len(),
            "Rendered preview page",
        );
        w.finish()
    }

    fn write_head(&self, w: &mut HtmlWriter, page: &Page, theme: &ThemeSettings, ctx: &RenderContext) {
        w.open("head", &[]).newline();
        w.open("meta", &[("charset", "utf-8")]).newline();
        w.open(
            "meta",
            &[
                ("name", "viewport"),
                ("content", "width=device-width, initial-scale=1"),
            ],
        )
        .newline();
        let title = page
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.options.default_title);
        w.element("title", &[], title).newline();

        if let Some(href) = google_fonts_url(&collect_google_fonts(theme)) {
            w.open(
                "link",
                &[
                    ("rel", "stylesheet"),
                    ("href", href.as_str()),
                    ("data-theme-fonts", ""),
                ],
            )
            .newline();
        }

        // Values were checked for characters that could end the rule or
        // the style element during projection.
        w.open("style", &[("id", THEME_STYLE_ID)])
            .fragment(&to_root_css(&ctx.css_vars))
            .close("style")
            .newline();
        w.close("head").newline();
    }

    fn write_widget(&self, w: &mut HtmlWriter, widget_id: &str, widget: &Widget, ctx: &RenderContext) {
        match self.widgets.render_widget(widget_id, widget, ctx) {
            Ok(html) => {
                w.fragment(&html).newline();
            }
            Err(e) => {
                tracing::warn!(
                    widget_id = %widget_id,
                    widget_type = %widget.widget_type,
                    error = %e,
                    "Widget failed to render; emitting placeholder",
                );
                w.fragment(&WidgetRenderer::render_placeholder(widget_id, widget, &e))
                    .newline();
            }
        }
    }
}
