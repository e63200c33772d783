#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use pagewright_core::geometry::Rect;
use pagewright_core::media::MediaResolver;
use pagewright_core::page::{GlobalWidgets, Page};
use pagewright_core::schema::SchemaRegistry;
use pagewright_core::snapshot::EditorSnapshot;
use pagewright_core::theme::ThemeSettings;
use pagewright_core::widget::Widget;
use pagewright_preview::{
    EditorCommand, Envelope, FrameEndpoint, FrameHost, LocalRenderSource, MemoryDom, PreviewConfig,
    PreviewError, PreviewPort, PreviewRuntime, PreviewSession, RenderSource,
};
use pagewright_render::{PageOptions, PageRenderer, WidgetRenderer};

/// Viewport of the simulated iframe.
pub const VIEWPORT: Rect = Rect {
    top: 0.0,
    left: 0.0,
    width: 1024.0,
    height: 300.0,
};

/// Records every document loaded into the frame.
#[derive(Default)]
pub struct CapturingHost {
    documents: Mutex<Vec<(u64, String)>>,
}

impl CapturingHost {
    pub fn latest(&self) -> Option<(u64, String)> {
        self.documents.lock().unwrap().last().cloned()
    }
}

impl FrameHost for CapturingHost {
    fn load_document(&self, generation: u64, html: &str) {
        self.documents
            .lock()
            .unwrap()
            .push((generation, html.to_string()));
    }
}

/// In-process renderer that counts calls and can be told to fail or stall
/// for specific widgets.
pub struct CountingSource {
    inner: LocalRenderSource,
    pub page_renders: AtomicUsize,
    pub widget_renders: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    page_failures: AtomicUsize,
}

impl CountingSource {
    pub fn new() -> Self {
        let widgets = WidgetRenderer::new(Arc::new(SchemaRegistry::builtin().unwrap()));
        Self {
            inner: LocalRenderSource::new(
                PageRenderer::new(widgets, PageOptions::default()),
                MediaResolver::new("/api/media", "default"),
            ),
            page_renders: AtomicUsize::new(0),
            widget_renders: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            page_failures: AtomicUsize::new(0),
        }
    }

    pub fn fail_widget(&self, widget_id: &str) {
        self.failing.lock().unwrap().insert(widget_id.to_string());
    }

    pub fn delay_widget(&self, widget_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(widget_id.to_string(), delay);
    }

    /// Make the next `n` page renders fail.
    pub fn fail_next_pages(&self, n: usize) {
        self.page_failures.store(n, Ordering::SeqCst);
    }

    pub fn page_renders(&self) -> usize {
        self.page_renders.load(Ordering::SeqCst)
    }

    pub fn widget_renders(&self) -> usize {
        self.widget_renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSource for CountingSource {
    async fn render_widget(
        &self,
        widget_id: &str,
        widget: &Widget,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        self.widget_renders.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(widget_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(widget_id) {
            return Err(PreviewError::TransientRender("503 upstream unavailable".into()));
        }
        self.inner.render_widget(widget_id, widget, theme).await
    }

    async fn render_page(
        &self,
        page: &Page,
        globals: &GlobalWidgets,
        theme: &ThemeSettings,
    ) -> Result<String, PreviewError> {
        self.page_renders.fetch_add(1, Ordering::SeqCst);
        let remaining = self.page_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.page_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PreviewError::TransientRender("connection refused".into()));
        }
        self.inner.render_page(page, globals, theme).await
    }
}

/// Editor session wired to a simulated iframe running the real runtime
/// over a [`MemoryDom`].
pub struct Harness {
    pub session: PreviewSession,
    pub port: Arc<PreviewPort>,
    pub source: Arc<CountingSource>,
    pub host: Arc<CapturingHost>,
    pub runtime: Option<PreviewRuntime<MemoryDom>>,
    to_frame: UnboundedReceiver<Envelope>,
    from_frame: Option<UnboundedReceiver<Envelope>>,
    /// Editor → frame messages delivered since the last `take_delivered`.
    delivered: Vec<Value>,
    /// Commands produced by frame gestures.
    pub commands: Vec<EditorCommand>,
}

impl Harness {
    pub fn new(initial: EditorSnapshot) -> Self {
        Self::with_config(initial, PreviewConfig::default())
    }

    pub fn with_config(initial: EditorSnapshot, config: PreviewConfig) -> Self {
        let (port, to_frame) = PreviewPort::new();
        let port = Arc::new(port);
        let source = Arc::new(CountingSource::new());
        let host = Arc::new(CapturingHost::default());
        let session = PreviewSession::new(
            source.clone(),
            port.clone(),
            host.clone(),
            &config,
            initial,
        );
        Self {
            session,
            port,
            source,
            host,
            runtime: None,
            to_frame,
            from_frame: None,
            delivered: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Load the initial document and run the frame until idle.
    pub async fn start(initial: EditorSnapshot) -> Self {
        let mut harness = Self::new(initial);
        harness.session.load().await.unwrap();
        harness.pump().await;
        harness.take_delivered();
        harness
    }

    pub fn runtime(&self) -> &PreviewRuntime<MemoryDom> {
        self.runtime.as_ref().expect("frame booted")
    }

    pub fn runtime_mut(&mut self) -> &mut PreviewRuntime<MemoryDom> {
        self.runtime.as_mut().expect("frame booted")
    }

    pub fn dom(&self) -> &MemoryDom {
        self.runtime().dom()
    }

    /// Boot a new runtime if the host received a newer document.
    fn boot_if_reloaded(&mut self) {
        let Some((generation, html)) = self.host.latest() else {
            return;
        };
        if self
            .runtime
            .as_ref()
            .is_some_and(|r| r.generation() == generation)
        {
            return;
        }
        let (endpoint, rx) = FrameEndpoint::channel(generation);
        let mut runtime = PreviewRuntime::new(MemoryDom::load(&html, VIEWPORT), endpoint);
        runtime.start();
        self.runtime = Some(runtime);
        self.from_frame = Some(rx);
    }

    /// Move messages both ways until nothing is in flight.
    pub async fn pump(&mut self) {
        loop {
            self.boot_if_reloaded();
            let mut moved = false;

            let mut inbound = Vec::new();
            if let Some(rx) = self.from_frame.as_mut() {
                while let Ok(envelope) = rx.try_recv() {
                    inbound.push(envelope);
                }
            }
            for envelope in inbound {
                moved = true;
                if let Some(command) = self.session.handle_frame_message(envelope).await {
                    self.commands.push(command);
                }
            }

            while let Ok(envelope) = self.to_frame.try_recv() {
                moved = true;
                self.delivered.push(envelope.message.clone());
                if let Some(runtime) = self.runtime.as_mut() {
                    runtime.handle(envelope);
                }
            }

            if !moved {
                break;
            }
        }
    }

    pub fn take_delivered(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.delivered)
    }
}

/// Message kinds in delivery order.
pub fn kinds(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .map(|m| m["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn morph_targets(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m["type"] == json!("MORPH_WIDGET"))
        .map(|m| m["payload"]["widgetId"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn widget(widget_type: &str, title: &str) -> Widget {
    let registry = SchemaRegistry::builtin().unwrap();
    let mut n = 0;
    let mut w = Widget::from_schema(registry.get(widget_type).unwrap(), || {
        n += 1;
        format!("{widget_type}-block-{n}")
    });
    let key = if widget_type == "hero" { "title" } else { "heading" };
    w.settings.insert(key.into(), json!(title));
    w
}

/// Page `[hero, gallery]` with a white background theme.
pub fn hero_gallery_snapshot() -> EditorSnapshot {
    let mut page = Page::default();
    page.insert_widget("hero".into(), widget("hero", "A"), None)
        .unwrap();
    page.insert_widget("gallery".into(), widget("gallery", "Work"), None)
        .unwrap();
    EditorSnapshot::new(page, GlobalWidgets::default(), theme("#ffffff"))
}

/// `hero_gallery_snapshot` framed by a header and a footer.
pub fn framed_snapshot() -> EditorSnapshot {
    let mut snapshot = hero_gallery_snapshot();
    let registry = SchemaRegistry::builtin().unwrap();
    let mut n = 0;
    let mut ids = || {
        n += 1;
        format!("global-block-{n}")
    };
    let mut header = Widget::from_schema(registry.get("header").unwrap(), &mut ids);
    header.settings.insert("site_title".into(), json!("Acme"));
    let mut footer = Widget::from_schema(registry.get("footer").unwrap(), &mut ids);
    footer.settings.insert("copyright".into(), json!("Acme Ltd"));
    snapshot.global_widgets = GlobalWidgets {
        header: Some(header),
        footer: Some(footer),
    };
    snapshot
}

pub fn theme(background: &str) -> ThemeSettings {
    serde_json::from_value(json!({
        "colors": [
            { "id": "background", "type": "color", "value": background, "outputAsCssVar": true },
            { "id": "text", "type": "color", "value": "#111111", "outputAsCssVar": true }
        ],
        "typography": [
            { "id": "body", "type": "font_picker", "value": { "stack": "Inter, sans-serif", "weight": 400, "google": true } }
        ]
    }))
    .unwrap()
}
