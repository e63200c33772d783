//! Editor-side orchestration of one live preview.
//!
//! [`PreviewSession`] decides per snapshot whether the preview needs a
//! full reload (structural change) or a reconciliation pass, keeps the
//! overlay fed with the frame's bounds reports, and turns frame gestures
//! into [`EditorCommand`]s for the editor state layer.

use std::sync::Arc;

use pagewright_core::diff::{detect_structural_change, StructuralChange};
use pagewright_core::error::CoreError;
use pagewright_core::page::MoveDirection;
use pagewright_core::protocol::{ElementAddress, ParentMessage, PreviewMessage, SelectionPayload};
use pagewright_core::snapshot::{EditorSnapshot, Selection};
use pagewright_core::types::WidgetId;

use crate::client::RenderSource;
use crate::config::PreviewConfig;
use crate::engine::{ReconcileReport, ReconciliationEngine};
use crate::error::PreviewError;
use crate::overlay::Overlay;
use crate::transport::{Envelope, PreviewPort};

/// Where preview documents are loaded (the iframe).
pub trait FrameHost: Send + Sync {
    /// Replace the frame document. The runtime inside must tag its
    /// messages with `generation`.
    fn load_document(&self, generation: u64, html: &str);
}

/// What the editor shows in place of, or on top of, the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    /// A document was requested and its runtime has not reported ready.
    Loading,
    Ready,
    /// The full-document fetch failed; the editor shows a retry control.
    Failed { message: String },
}

/// Something the editor state layer must apply, produced by a gesture in
/// the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    Select(Option<ElementAddress>),
    Reorder {
        widget_id: WidgetId,
        direction: MoveDirection,
    },
}

impl EditorCommand {
    /// The snapshot after this command. A reorder at the edge of the page
    /// returns the snapshot unchanged.
    pub fn apply(&self, snapshot: &EditorSnapshot) -> Result<EditorSnapshot, CoreError> {
        match self {
            Self::Select(address) => {
                let selection = match address {
                    Some(a) => Selection {
                        widget_id: Some(a.widget_id.clone()),
                        block_id: a.block_id.clone(),
                    },
                    None => Selection::none(),
                };
                Ok(snapshot.clone().with_selection(selection))
            }
            Self::Reorder {
                widget_id,
                direction,
            } => {
                let mut page = snapshot.page();
                page.move_widget(widget_id, *direction)?;
                let mut next = snapshot.clone();
                next.widgets_order = page.widgets_order;
                Ok(next)
            }
        }
    }
}

/// Result of [`PreviewSession::update`].
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The preview is in the failed state; the snapshot is kept for the
    /// next retry.
    Deferred,
    Reloaded(StructuralChange),
    Reconciled(ReconcileReport),
}

pub struct PreviewSession {
    source: Arc<dyn RenderSource>,
    port: Arc<PreviewPort>,
    host: Arc<dyn FrameHost>,
    engine: ReconciliationEngine,
    overlay: Overlay,
    status: PreviewStatus,
    snapshot: Arc<EditorSnapshot>,
}

impl PreviewSession {
    pub fn new(
        source: Arc<dyn RenderSource>,
        port: Arc<PreviewPort>,
        host: Arc<dyn FrameHost>,
        config: &PreviewConfig,
        initial: EditorSnapshot,
    ) -> Self {
        let snapshot = Arc::new(initial);
        let engine = ReconciliationEngine::new(
            source.clone(),
            port.clone(),
            config.render_timeout,
            snapshot.clone(),
        );
        Self {
            source,
            port,
            host,
            engine,
            overlay: Overlay::default(),
            status: PreviewStatus::Loading,
            snapshot,
        }
    }

    pub fn status(&self) -> &PreviewStatus {
        &self.status
    }

    /// Latest editor snapshot seen by the session.
    pub fn snapshot(&self) -> &EditorSnapshot {
        &self.snapshot
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// For iframe and container resize/load events.
    pub fn overlay_mut(&mut self) -> &mut Overlay {
        &mut self.overlay
    }

    /// Render the full document for the latest snapshot and load it into
    /// the frame under a new generation.
    pub async fn load(&mut self) -> Result<u64, PreviewError> {
        self.status = PreviewStatus::Loading;
        let snapshot = self.snapshot.clone();
        let html = match self
            .source
            .render_page(
                &snapshot.page(),
                &snapshot.global_widgets,
                &snapshot.theme_settings,
            )
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "Preview document failed to load");
                let err = PreviewError::InitialLoadFailed(e.to_string());
                self.status = PreviewStatus::Failed {
                    message: err.to_string(),
                };
                return Err(err);
            }
        };

        let generation = self.port.reload().await;
        self.host.load_document(generation, &html);
        self.engine.reset(snapshot.clone());
        self.overlay.clear_boxes();
        self.overlay.select(snapshot.selection.address());

        // Queued until the new document reports ready.
        if let Some(address) = snapshot.selection.address() {
            self.send(&ParentMessage::UpdateSelection(SelectionPayload::from(Some(
                address,
            ))))
            .await;
        }
        tracing::info!(generation, bytes = html.len(), "Preview document loaded");
        Ok(generation)
    }

    /// Retry after a failed load.
    pub async fn retry(&mut self) -> Result<u64, PreviewError> {
        self.load().await
    }

    /// Bring the preview up to date with a new editor snapshot.
    pub async fn update(&mut self, next: EditorSnapshot) -> Result<UpdateOutcome, PreviewError> {
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut self.snapshot, next.clone());

        if matches!(self.status, PreviewStatus::Failed { .. }) {
            return Ok(UpdateOutcome::Deferred);
        }

        if let Some(change) = detect_structural_change(self.engine.previous(), &next) {
            tracing::debug!(change = %change, "Structural change; reloading preview");
            self.load().await?;
            return Ok(UpdateOutcome::Reloaded(change));
        }

        let report = self.engine.reconcile(next.clone()).await;
        if previous.selection != next.selection {
            let address = next.selection.address();
            self.overlay.select(address.clone());
            self.send(&ParentMessage::UpdateSelection(SelectionPayload::from(address)))
                .await;
        }
        Ok(UpdateOutcome::Reconciled(report))
    }

    /// Accept a message from the frame. Returns the editor command a
    /// gesture maps to, if any.
    pub async fn handle_frame_message(&mut self, envelope: Envelope) -> Option<EditorCommand> {
        match self.port.handle_inbound(envelope).await? {
            PreviewMessage::PreviewReady => {
                self.status = PreviewStatus::Ready;
                None
            }
            PreviewMessage::ElementBounds(bounds) => {
                self.overlay.on_bounds(&bounds);
                None
            }
            PreviewMessage::WidgetHovered(bounds) => {
                self.overlay.on_hover(&bounds);
                None
            }
            PreviewMessage::WidgetSelected(address) => Some(EditorCommand::Select(Some(address))),
            PreviewMessage::ReorderWidget(payload) => Some(EditorCommand::Reorder {
                widget_id: payload.widget_id,
                direction: payload.direction,
            }),
        }
    }

    /// Hover from the editor sidebar. The frame answers with
    /// `WIDGET_HOVERED` for the overlay; `None` clears the hover box.
    pub async fn sidebar_hover(&mut self, address: Option<ElementAddress>) {
        if address.is_none() {
            self.overlay.clear_hover();
        }
        self.send(&ParentMessage::SidebarHover(SelectionPayload::from(address)))
            .await;
    }

    pub async fn scroll_to(&self, address: ElementAddress) {
        self.send(&ParentMessage::ScrollToElement(address)).await;
    }

    async fn send(&self, message: &ParentMessage) {
        if let Err(e) = self.port.send(message).await {
            tracing::warn!(kind = message.kind(), error = %e, "Failed to send preview message");
        }
    }
}
