//! Handlers for the preview renderer and the global widget store.
//!
//! Render endpoints return `text/html`; the global widget endpoints speak
//! JSON. Every request is scoped to the project named by `x-project-id`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use validator::Validate;

use pagewright_core::media::MediaResolver;
use pagewright_core::page::GlobalWidgetKind;
use pagewright_core::widget::Widget;
use pagewright_core::wire::{PreviewPageRequest, PreviewWidgetRequest, SaveGlobalWidgetResponse};
use pagewright_render::RenderContext;

use crate::error::AppResult;
use crate::middleware::project::ProjectScope;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// POST /preview
///
/// Render the full preview document. Global widgets sent with the page
/// take precedence over the stored ones, so unsaved header/footer edits
/// show up immediately.
pub async fn render_page(
    project: ProjectScope,
    State(state): State<AppState>,
    payload: Result<Json<PreviewPageRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let (page, inline_globals) = input.page_data.into_parts();
    page.validate()?;

    let globals = match inline_globals {
        Some(globals) => globals,
        None => state.store.load_global_widgets(project.as_str()).await?,
    };

    let media = media_resolver(&state, &project);
    let html = state
        .renderer
        .render_page(&page, &globals, &input.theme_settings, media);

    tracing::debug!(
        project_id = %project.as_str(),
        widgets = page.widgets_order.len(),
        bytes = html.len(),
        "Rendered preview document",
    );

    Ok(Html(html))
}

/// POST /preview/widget
///
/// Render one widget fragment for a live morph. Unknown widget or block
/// types are a 400 with `UNKNOWN_WIDGET_TYPE` / `UNKNOWN_BLOCK_TYPE`.
pub async fn render_widget(
    project: ProjectScope,
    State(state): State<AppState>,
    payload: Result<Json<PreviewWidgetRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;
    input.widget.validate_blocks()?;

    let ctx = RenderContext::new(&input.theme_settings, media_resolver(&state, &project));
    let html = state
        .renderer
        .widget_renderer()
        .render_widget(&input.widget_id, &input.widget, &ctx)
        .inspect_err(|e| {
            tracing::warn!(
                widget_id = %input.widget_id,
                widget_type = %input.widget.widget_type,
                error = %e,
                "Widget render rejected",
            );
        })?;

    Ok(Html(html))
}

// ---------------------------------------------------------------------------
// Global widgets
// ---------------------------------------------------------------------------

/// GET /preview/global-widgets
///
/// Stored header and footer; either may be `null`.
pub async fn get_global_widgets(
    project: ProjectScope,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let globals = state.store.load_global_widgets(project.as_str()).await?;
    Ok(Json(globals))
}

/// POST /preview/global-widgets/{type}
///
/// Store the header or footer. The widget and all of its blocks must
/// resolve against the schema registry.
pub async fn save_global_widget(
    project: ProjectScope,
    State(state): State<AppState>,
    Path(widget_type): Path<String>,
    payload: Result<Json<Widget>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let kind: GlobalWidgetKind = widget_type.parse()?;
    let Json(widget) = payload?;

    widget.validate_blocks()?;
    let schema = state
        .renderer
        .widget_renderer()
        .registry()
        .get(&widget.widget_type)?;
    for (_, block) in widget.ordered_blocks() {
        schema.block(&block.block_type)?;
    }

    state
        .store
        .save_global_widget(project.as_str(), kind, &widget)
        .await?;

    tracing::info!(
        project_id = %project.as_str(),
        kind = %kind,
        widget_type = %widget.widget_type,
        "Global widget saved",
    );

    Ok(Json(SaveGlobalWidgetResponse { success: true }))
}

fn media_resolver(state: &AppState, project: &ProjectScope) -> MediaResolver {
    MediaResolver::new(&state.config.media_endpoint, project.as_str())
}
