//! Reconciliation engine.
//!
//! Holds two snapshot slots, `previous` (what the preview document shows)
//! and `current` (what the editor shows). A pass stages the new snapshot,
//! diffs the two slots at content level, re-renders every changed widget
//! concurrently and morphs each one as soon as its HTML arrives. Theme
//! changes become a single `UPDATE_CSS_VARIABLES` message (plus
//! `LOAD_FONTS` for newly referenced Google fonts).
//!
//! After every pass `previous` becomes `current`, whether or not each
//! morph succeeded. A failed morph leaves that widget stale until its next
//! edit or the next reload.
//!
//! Structural changes are not handled here. The caller checks
//! [`detect_structural_change`](pagewright_core::diff::detect_structural_change)
//! first and reloads instead.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

use pagewright_core::css_vars::settings_to_css_variables;
use pagewright_core::diff::{compute_content_diff, ContentDiff};
use pagewright_core::fonts::{collect_google_fonts, newly_requested, FontRequests};
use pagewright_core::protocol::{CssVariablesPayload, MorphWidgetPayload, ParentMessage};
use pagewright_core::snapshot::EditorSnapshot;
use pagewright_core::types::WidgetId;

use crate::client::RenderSource;
use crate::error::PreviewError;
use crate::transport::PreviewPort;

/// The two snapshots a pass compares.
#[derive(Debug, Clone)]
pub struct SnapshotSlots {
    previous: Arc<EditorSnapshot>,
    current: Arc<EditorSnapshot>,
}

impl SnapshotSlots {
    /// Both slots start at the snapshot the preview document was rendered
    /// from.
    pub fn new(initial: Arc<EditorSnapshot>) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
        }
    }

    pub fn previous(&self) -> &Arc<EditorSnapshot> {
        &self.previous
    }

    pub fn current(&self) -> &Arc<EditorSnapshot> {
        &self.current
    }

    pub fn stage(&mut self, next: Arc<EditorSnapshot>) {
        self.current = next;
    }

    /// The only transition out of a pass: `previous := current`.
    pub fn commit(&mut self) {
        self.previous = self.current.clone();
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub diff: ContentDiff,
    /// Widgets whose morph was dispatched to the current document.
    pub morphed: Vec<WidgetId>,
    /// Widgets whose render failed or timed out.
    pub failures: Vec<(WidgetId, PreviewError)>,
    /// Morphs dropped because the document was reloaded mid-pass.
    pub stale: Vec<WidgetId>,
    pub css_updated: bool,
    pub fonts_requested: FontRequests,
}

impl ReconcileReport {
    /// Number of messages this pass put on the wire.
    pub fn messages_sent(&self) -> usize {
        self.morphed.len()
            + usize::from(self.css_updated)
            + usize::from(!self.fonts_requested.is_empty())
    }
}

/// Applies content-level snapshot changes to the live preview.
pub struct ReconciliationEngine {
    source: Arc<dyn RenderSource>,
    port: Arc<PreviewPort>,
    render_timeout: Duration,
    slots: SnapshotSlots,
}

impl ReconciliationEngine {
    pub fn new(
        source: Arc<dyn RenderSource>,
        port: Arc<PreviewPort>,
        render_timeout: Duration,
        initial: Arc<EditorSnapshot>,
    ) -> Self {
        Self {
            source,
            port,
            render_timeout,
            slots: SnapshotSlots::new(initial),
        }
    }

    pub fn slots(&self) -> &SnapshotSlots {
        &self.slots
    }

    /// The snapshot the preview document currently reflects.
    pub fn previous(&self) -> &EditorSnapshot {
        &self.slots.previous
    }

    /// Reset both slots after a full document reload.
    pub fn reset(&mut self, snapshot: Arc<EditorSnapshot>) {
        self.slots = SnapshotSlots::new(snapshot);
    }

    /// Run one pass from `previous` to `next`.
    pub async fn reconcile(&mut self, next: Arc<EditorSnapshot>) -> ReconcileReport {
        self.slots.stage(next);
        let report = self.run_pass().await;
        self.slots.commit();
        report
    }

    async fn run_pass(&self) -> ReconcileReport {
        let previous = self.slots.previous.clone();
        let current = self.slots.current.clone();
        let diff = compute_content_diff(&previous, &current);
        let mut report = ReconcileReport {
            diff: diff.clone(),
            ..ReconcileReport::default()
        };
        if diff.is_empty() {
            return report;
        }

        // Everything sent in this pass targets the document that was live
        // when it started.
        let generation = self.port.generation().await;

        if diff.theme_changed {
            self.push_theme(generation, &previous, &current, &mut report)
                .await;
        }

        let mut renders: FuturesUnordered<_> = diff
            .morph_targets()
            .into_iter()
            .filter_map(|widget_id| {
                let widget = current.widget(&widget_id)?;
                let source = self.source.clone();
                let theme = &current.theme_settings;
                let timeout = self.render_timeout;
                Some(async move {
                    let result = tokio::time::timeout(
                        timeout,
                        source.render_widget(&widget_id, widget, theme),
                    )
                    .await
                    .unwrap_or_else(|_| Err(PreviewError::timeout(widget_id.clone(), timeout)));
                    (widget_id, result)
                })
            })
            .collect();

        while let Some((widget_id, result)) = renders.next().await {
            match result {
                Ok(html) => {
                    let message = ParentMessage::MorphWidget(MorphWidgetPayload {
                        widget_id: widget_id.clone(),
                        html,
                    });
                    match self.port.send_for_generation(generation, &message).await {
                        Ok(true) => report.morphed.push(widget_id),
                        Ok(false) => report.stale.push(widget_id),
                        Err(e) => {
                            tracing::warn!(widget_id = %widget_id, error = %e, "Failed to send morph");
                            report.failures.push((widget_id, e));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(widget_id = %widget_id, error = %e, "Widget render failed; skipping morph");
                    report.failures.push((widget_id, e));
                }
            }
        }

        tracing::debug!(
            generation,
            morphed = report.morphed.len(),
            failed = report.failures.len(),
            stale = report.stale.len(),
            css = report.css_updated,
            "Reconciliation pass complete",
        );
        report
    }

    async fn push_theme(
        &self,
        generation: u64,
        previous: &EditorSnapshot,
        current: &EditorSnapshot,
        report: &mut ReconcileReport,
    ) {
        let variables = settings_to_css_variables(&current.theme_settings);
        let message = ParentMessage::UpdateCssVariables(CssVariablesPayload { variables });
        match self.port.send_for_generation(generation, &message).await {
            Ok(sent) => report.css_updated = sent,
            Err(e) => tracing::warn!(error = %e, "Failed to send CSS variables"),
        }

        let fresh = newly_requested(
            &collect_google_fonts(&previous.theme_settings),
            &collect_google_fonts(&current.theme_settings),
        );
        if fresh.is_empty() {
            return;
        }
        match self
            .port
            .send_for_generation(generation, &ParentMessage::LoadFonts(fresh.clone()))
            .await
        {
            Ok(true) => report.fonts_requested = fresh,
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to send font request"),
        }
    }
}
