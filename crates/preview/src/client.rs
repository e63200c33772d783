//! Sources of rendered HTML.
//!
//! [`HttpRenderSource`] calls the preview API; [`LocalRenderSource`]
//! renders in-process with the same renderer the server uses.

use async_trait::async_trait;

use pagewright_core::media::MediaResolver;
use pagewright_core::page::{GlobalWidgetKind, GlobalWidgets, Page};
use pagewright_core::theme::ThemeSettings;
use pagewright_core::widget::Widget;
use pagewright_core::wire::{
    ErrorBody, GlobalWidgetsResponse, PageData, PreviewPageRequest, PreviewWidgetRequest,
    SaveGlobalWidgetResponse,
};
use pagewright_render::{PageRenderer, RenderContext};

use crate::config::PreviewConfig;
use crate::error::PreviewError;

/// Header carrying the active project id.
pub const PROJECT_ID_HEADER: &str = "x-project-id";

/// Error codes that mean the widget can never render as-is.
const SCHEMA_ERROR_CODES: &[&str] = &["UNKNOWN_WIDGET_TYPE", "UNKNOWN_BLOCK_TYPE"];

/// Produces widget fragments and full preview documents.
#[async_trait]
pub trait RenderSource: Send + Sync {
    async fn render_widget(
        &self,
        widget_id: &str,
        widget: &Widget,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError>;

    async fn render_page(
        &self,
        page: &Page,
        globals: &GlobalWidgets,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP client for the preview endpoints of one project.
pub struct HttpRenderSource {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
}

impl HttpRenderSource {
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:3000`.
    pub fn new(api_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, project_id)
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling across
    /// projects).
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        }
    }

    pub fn from_config(config: &PreviewConfig, project_id: impl Into<String>) -> Self {
        Self::new(config.api_url.clone(), project_id)
    }

    /// `GET /preview/global-widgets`.
    pub async fn fetch_global_widgets(&self) -> Result<GlobalWidgetsResponse, PreviewError> {
        let response = self
            .client
            .get(format!("{}/preview/global-widgets", self.api_url))
            .header(PROJECT_ID_HEADER, &self.project_id)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<GlobalWidgetsResponse>().await?)
    }

    /// `POST /preview/global-widgets/{type}`.
    pub async fn save_global_widget(
        &self,
        kind: GlobalWidgetKind,
        widget: &Widget,
    ) -> Result<bool, PreviewError> {
        let response = self
            .client
            .post(format!("{}/preview/global-widgets/{kind}", self.api_url))
            .header(PROJECT_ID_HEADER, &self.project_id)
            .json(widget)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<SaveGlobalWidgetResponse>().await?.success)
    }

    // ---- private helpers ----

    /// Map a non-2xx response to a schema or transient error using the
    /// `{error, code}` body.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PreviewError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
        let message = body
            .as_ref()
            .map(|b| b.error.clone())
            .unwrap_or(text);
        let is_schema_error = body
            .as_ref()
            .and_then(|b| b.code.as_deref())
            .is_some_and(|code| SCHEMA_ERROR_CODES.contains(&code));
        if is_schema_error {
            Err(PreviewError::SchemaResolution(message))
        } else {
            Err(PreviewError::TransientRender(format!(
                "{} {}",
                status.as_u16(),
                message
            )))
        }
    }

    async fn post_for_html<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, PreviewError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .header(PROJECT_ID_HEADER, &self.project_id)
            .json(body)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl RenderSource for HttpRenderSource {
    async fn render_widget(
        &self,
        widget_id: &str,
        widget: &Widget,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        let body = PreviewWidgetRequest {
            widget_id: widget_id.to_string(),
            widget: widget.clone(),
            theme_settings: theme.clone(),
        };
        self.post_for_html("/preview/widget", &body).await
    }

    async fn render_page(
        &self,
        page: &Page,
        globals: &GlobalWidgets,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        let body = PreviewPageRequest {
            page_data: PageData::from_parts(page.clone(), Some(globals.clone())),
            theme_settings: theme.clone(),
        };
        self.post_for_html("/preview", &body).await
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

/// Renders in-process.
pub struct LocalRenderSource {
    renderer: PageRenderer,
    media: MediaResolver,
}

impl LocalRenderSource {
    pub fn new(renderer: PageRenderer, media: MediaResolver) -> Self {
        Self { renderer, media }
    }
}

#[async_trait]
impl RenderSource for LocalRenderSource {
    async fn render_widget(
        &self,
        widget_id: &str,
        widget: &Widget,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        let ctx = RenderContext::new(theme, self.media.clone());
        Ok(self
            .renderer
            .widget_renderer()
            .render_widget(widget_id, widget, &ctx)?)
    }

    async fn render_page(
        &self,
        page: &Page,
        globals: &GlobalWidgets,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        Ok(self
            .renderer
            .render_page(page, globals, theme, self.media.clone()))
    }
}
