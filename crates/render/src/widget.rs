//! Widget renderer.
//!
//! Renders one widget to an HTML fragment whose root element carries
//! `data-widget-id`/`data-widget-type` and whose blocks carry
//! `data-block-id`. Every setting goes through the sanitizer before it is
//! written; invalid or missing values fall back to the schema default.

use std::sync::Arc;

use pagewright_core::css_vars::{
    format_number, is_safe_css_value, settings_to_css_variables, variable_name, CssVariables,
};
use pagewright_core::error::CoreError;
use pagewright_core::media::MediaResolver;
use pagewright_core::sanitize::{sanitize, SanitizedValue};
use pagewright_core::schema::{SchemaRegistry, SettingSchema, SettingType};
use pagewright_core::theme::ThemeSettings;
use pagewright_core::widget::{Settings, Widget};

use crate::html::{text_element, HtmlWriter};

/// Per-request inputs shared by every widget on a page.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Projected theme variables, used to resolve `@group.id` colours.
    pub css_vars: CssVariables,
    pub media: MediaResolver,
}

impl RenderContext {
    pub fn new(theme: &ThemeSettings, media: MediaResolver) -> Self {
        Self {
            css_vars: settings_to_css_variables(theme),
            media,
        }
    }
}

/// Renders widgets against a schema registry.
#[derive(Debug, Clone)]
pub struct WidgetRenderer {
    registry: Arc<SchemaRegistry>,
}

impl WidgetRenderer {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Render `widget` as the fragment addressed by `widget_id`.
    ///
    /// Fails with `UnknownWidgetType`/`UnknownBlockType` when the widget or
    /// one of its blocks has no schema. Bad setting values never fail.
    pub fn render_widget(
        &self,
        widget_id: &str,
        widget: &Widget,
        ctx: &RenderContext,
    ) -> Result<String, CoreError> {
        let schema = self.registry.get(&widget.widget_type)?;

        // Resolve every block schema up front so a bad block fails the
        // whole widget before anything is written.
        let mut blocks = Vec::with_capacity(widget.blocks_order.len());
        for (block_id, block) in widget.ordered_blocks() {
            blocks.push((block_id, block, schema.block(&block.block_type)?));
        }

        let mut w = HtmlWriter::with_capacity(1024);
        let root = SettingsView::resolve(&schema.settings, &widget.settings, ctx);
        let class = root.class_list(&["widget", &format!("widget-{}", widget.widget_type)]);
        let style = root.style();

        let mut attrs = vec![
            ("class", class.as_str()),
            ("data-widget-id", widget_id),
            ("data-widget-type", widget.widget_type.as_str()),
        ];
        if !style.is_empty() {
            attrs.push(("style", style.as_str()));
        }
        w.open("section", &attrs);
        root.write_content(&mut w, ctx);

        if !blocks.is_empty() {
            w.open("div", &[("class", "widget-blocks")]);
            for (block_id, block, block_schema) in blocks {
                let view = SettingsView::resolve(&block_schema.settings, &block.settings, ctx);
                let class =
                    view.class_list(&["block", &format!("block-{}", block.block_type)]);
                let style = view.style();
                let mut attrs = vec![
                    ("class", class.as_str()),
                    ("data-block-id", block_id.as_str()),
                    ("data-block-type", block.block_type.as_str()),
                ];
                if !style.is_empty() {
                    attrs.push(("style", style.as_str()));
                }
                w.open("div", &attrs);
                view.write_content(&mut w, ctx);
                w.close("div");
            }
            w.close("div");
        }

        w.close("section");
        Ok(w.finish())
    }

    /// Placeholder emitted in place of a widget that cannot be rendered,
    /// so the element stays addressable.
    pub fn render_placeholder(widget_id: &str, widget: &Widget, error: &CoreError) -> String {
        let mut w = HtmlWriter::new();
        let message = error.to_string();
        w.open(
            "section",
            &[
                ("class", "widget widget-unresolved"),
                ("data-widget-id", widget_id),
                ("data-widget-type", widget.widget_type.as_str()),
                ("data-render-error", message.as_str()),
            ],
        )
        .close("section");
        w.finish()
    }
}

// ---------------------------------------------------------------------------
// Setting resolution
// ---------------------------------------------------------------------------

/// Sanitized settings of one widget or block, in schema order.
struct SettingsView<'a> {
    resolved: Vec<(&'a SettingSchema, SanitizedValue)>,
}

impl<'a> SettingsView<'a> {
    fn resolve(schemas: &'a [SettingSchema], settings: &Settings, ctx: &RenderContext) -> Self {
        let resolved = schemas
            .iter()
            .map(|schema| {
                let value = sanitize(settings.get(&schema.id), schema);
                (schema, resolve_theme_color(value, schema, ctx))
            })
            .collect();
        Self { resolved }
    }

    /// Base classes plus modifier classes from choice and flag settings.
    fn class_list(&self, base: &[&str]) -> String {
        let mut classes: Vec<String> = base.iter().map(|c| c.to_string()).collect();
        for (schema, value) in &self.resolved {
            match value {
                SanitizedValue::Choice(choice) => {
                    classes.push(format!("{}-{}", schema.id, class_token(choice)));
                }
                SanitizedValue::Flag(true) => classes.push(format!("is-{}", schema.id)),
                _ => {}
            }
        }
        classes.join(" ")
    }

    /// Inline custom properties from numeric, colour and font settings.
    fn style(&self) -> String {
        let mut decls = Vec::new();
        for (schema, value) in &self.resolved {
            let css = match value {
                SanitizedValue::Number(n) => {
                    Some(format!("{}{}", format_number(*n), schema.unit.as_deref().unwrap_or("")))
                }
                SanitizedValue::Color(hex) => Some(hex.clone()),
                SanitizedValue::ThemeColor { group, id } => {
                    Some(format!("var({})", variable_name(group, id)))
                }
                SanitizedValue::Font(font) => Some(font.stack.clone()),
                _ => None,
            };
            if let Some(css) = css.filter(|v| is_safe_css_value(v)) {
                decls.push(format!("--{}: {}", schema.id, css));
            }
        }
        decls.join("; ")
    }

    fn write_content(&self, w: &mut HtmlWriter, ctx: &RenderContext) {
        for (schema, value) in &self.resolved {
            write_setting(w, schema, value, ctx);
        }
    }
}

/// A `@group.id` colour only applies when that theme variable exists;
/// otherwise the schema default is used.
fn resolve_theme_color(
    value: SanitizedValue,
    schema: &SettingSchema,
    ctx: &RenderContext,
) -> SanitizedValue {
    let projected = |group: &str, id: &str| ctx.css_vars.contains_key(&variable_name(group, id));
    match value {
        SanitizedValue::ThemeColor { ref group, ref id } if !projected(group, id) => {
            match sanitize(None, schema) {
                SanitizedValue::ThemeColor { ref group, ref id } if !projected(group, id) => {
                    SanitizedValue::Empty
                }
                fallback => fallback,
            }
        }
        other => other,
    }
}

fn write_setting(w: &mut HtmlWriter, schema: &SettingSchema, value: &SanitizedValue, ctx: &RenderContext) {
    let class_name = format!("setting setting-{}", schema.id);
    let class = class_name.as_str();
    let id = schema.id.as_str();
    match (schema.setting_type, value) {
        (_, SanitizedValue::Text(text)) if !text.is_empty() => {
            let fallback = if schema.setting_type == SettingType::Textarea {
                "p"
            } else {
                "div"
            };
            let tag = text_element(schema.element.as_deref(), fallback);
            w.element(tag, &[("class", class), ("data-setting", id)], text);
        }
        (_, SanitizedValue::Html(html)) if !html.is_empty() => {
            w.open("div", &[("class", class), ("data-setting", id)])
                .trusted(&ctx.media.rewrite_html(html))
                .close("div");
        }
        (_, SanitizedValue::Link(link)) => {
            let mut attrs = vec![
                ("class", class),
                ("data-setting", id),
                ("href", link.href.as_str()),
            ];
            if link.open_in_new_tab {
                attrs.push(("target", "_blank"));
                attrs.push(("rel", "noopener noreferrer"));
            }
            w.element("a", &attrs, &link.text);
        }
        (SettingType::Image, SanitizedValue::Media(src)) => {
            let src = ctx.media.resolve(src);
            w.open(
                "img",
                &[("class", class), ("data-setting", id), ("src", src.as_str()), ("alt", "")],
            )
            .close("img");
        }
        (SettingType::Video | SettingType::Audio, SanitizedValue::Media(src)) => {
            let tag = schema.setting_type.as_str();
            let src = ctx.media.resolve(src);
            w.open(
                tag,
                &[("class", class), ("data-setting", id), ("src", src.as_str()), ("controls", "")],
            )
            .close(tag);
        }
        (_, SanitizedValue::Code(code)) if !code.is_empty() => {
            w.open("pre", &[("class", class), ("data-setting", id)])
                .element("code", &[], code)
                .close("pre");
        }
        // Numbers, colours, fonts, choices and flags are expressed as
        // classes and custom properties on the owning element.
        _ => {}
    }
}

/// Restrict a choice value to characters valid in a class name.
fn class_token(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
