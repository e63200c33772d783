//! The editor's HTTP render client against a live server.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;

use pagewright_core::page::{GlobalWidgetKind, GlobalWidgets, Page};
use pagewright_core::theme::ThemeSettings;
use pagewright_core::widget::Widget;
use pagewright_preview::{HttpRenderSource, PreviewConfig, PreviewError, RenderSource};

use common::{closed_url, memory_app, serve};

fn widget(value: serde_json::Value) -> Widget {
    serde_json::from_value(value).unwrap()
}

// ---------------------------------------------------------------------------
// Test: a known widget renders to a fragment carrying its id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_widget_returns_fragment() {
    let source = HttpRenderSource::new(serve(memory_app()).await, "default");
    let html = source
        .render_widget(
            "w1",
            &widget(json!({ "type": "hero", "settings": { "title": "Hello" } })),
            &ThemeSettings::new(),
        )
        .await
        .unwrap();
    assert!(html.starts_with("<section"));
    assert!(html.contains("data-widget-id=\"w1\""));
    assert!(html.contains("Hello"));
}

// ---------------------------------------------------------------------------
// Test: unknown widget and block types map to schema errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_types_are_schema_resolution_errors() {
    let source = HttpRenderSource::new(serve(memory_app()).await, "default");

    let result = source
        .render_widget("w1", &Widget::new("nope"), &ThemeSettings::new())
        .await;
    assert_matches!(result, Err(PreviewError::SchemaResolution(msg)) if msg.contains("nope"));

    let with_slider = widget(json!({
        "type": "hero",
        "blocks": { "b1": { "type": "slider" } },
        "blocksOrder": ["b1"]
    }));
    let result = source
        .render_widget("w1", &with_slider, &ThemeSettings::new())
        .await;
    assert_matches!(result, Err(PreviewError::SchemaResolution(msg)) if msg.contains("slider"));
}

// ---------------------------------------------------------------------------
// Test: other error responses map to transient errors with the status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_failure_is_a_transient_error() {
    let source = HttpRenderSource::new(serve(memory_app()).await, "default");
    let result = source
        .render_widget("", &Widget::new("hero"), &ThemeSettings::new())
        .await;
    assert_matches!(result, Err(PreviewError::TransientRender(msg)) if msg.starts_with("400 "));
}

// ---------------------------------------------------------------------------
// Test: an unreachable server is a transient error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_server_is_a_transient_error() {
    let source = HttpRenderSource::new(closed_url().await, "default");
    let result = source
        .render_widget("w1", &Widget::new("hero"), &ThemeSettings::new())
        .await;
    assert_matches!(result, Err(PreviewError::TransientRender(_)));

    let result = source.fetch_global_widgets().await;
    assert_matches!(result, Err(PreviewError::TransientRender(_)));
}

// ---------------------------------------------------------------------------
// Test: a full document comes back with the page name as title
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_page_returns_document() {
    let source = HttpRenderSource::new(serve(memory_app()).await, "default");
    let mut page = Page {
        name: Some("Landing".into()),
        ..Page::default()
    };
    page.insert_widget("hero".into(), Widget::new("hero"), None)
        .unwrap();

    let html = source
        .render_page(&page, &GlobalWidgets::default(), &ThemeSettings::new())
        .await
        .unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Landing</title>"));
    assert!(html.contains("data-widget-id=\"hero\""));
}

// ---------------------------------------------------------------------------
// Test: saved global widgets are fetched back for the same project only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_widgets_round_trip_per_project() {
    let base = serve(memory_app()).await;
    let config = PreviewConfig {
        api_url: base.clone(),
        render_timeout: Duration::from_secs(5),
    };
    let acme = HttpRenderSource::from_config(&config, "acme");
    let other = HttpRenderSource::from_config(&config, "other");

    let header = widget(json!({ "type": "header", "settings": { "site_title": "Acme" } }));
    assert!(acme
        .save_global_widget(GlobalWidgetKind::Header, &header)
        .await
        .unwrap());

    let globals = acme.fetch_global_widgets().await.unwrap();
    assert_eq!(globals.header.unwrap().settings["site_title"], "Acme");
    assert!(globals.footer.is_none());

    let globals = other.fetch_global_widgets().await.unwrap();
    assert!(globals.header.is_none());
}

// ---------------------------------------------------------------------------
// Test: saving a global widget of an unknown type is a schema error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_global_widget_rejects_unknown_type() {
    let source = HttpRenderSource::new(serve(memory_app()).await, "default");
    let result = source
        .save_global_widget(GlobalWidgetKind::Footer, &Widget::new("mega-menu"))
        .await;
    assert_matches!(result, Err(PreviewError::SchemaResolution(_)));
    assert!(source.fetch_global_widgets().await.unwrap().footer.is_none());
}
