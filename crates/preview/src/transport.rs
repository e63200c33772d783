//! Generation-tagged message transport between editor and preview frame.
//!
//! Every loaded preview document has a generation number. Messages in
//! both directions carry it, and anything addressed to a superseded
//! generation is dropped. This is how a slow morph for the document
//! before a reload is kept away from the document after it.
//!
//! Until the frame reports `PREVIEW_READY`, outgoing messages are queued
//! and then flushed in send order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use pagewright_core::protocol::{ParentMessage, PreviewMessage};

use crate::error::PreviewError;

/// One message on the wire, tagged with the document generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub generation: u64,
    pub message: Value,
}

struct PortState {
    generation: u64,
    ready: bool,
    pending: Vec<Value>,
}

/// Editor side of the transport.
pub struct PreviewPort {
    state: Mutex<PortState>,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl PreviewPort {
    /// Create a port and the receiving end that delivers to the frame.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let port = Self {
            state: Mutex::new(PortState {
                generation: 0,
                ready: false,
                pending: Vec::new(),
            }),
            outbound: tx,
        };
        (port, rx)
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    pub async fn is_ready(&self) -> bool {
        self.state.lock().await.ready
    }

    /// Start a new document generation. Queued messages for the old
    /// document are discarded and the port waits for `PREVIEW_READY` again.
    pub async fn reload(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.ready = false;
        let dropped = std::mem::take(&mut state.pending).len();
        tracing::debug!(
            generation = state.generation,
            dropped,
            "Preview generation advanced",
        );
        state.generation
    }

    /// Send to the current document.
    pub async fn send(&self, message: &ParentMessage) -> Result<bool, PreviewError> {
        let generation = self.generation().await;
        self.send_for_generation(generation, message).await
    }

    /// Send a message produced for `generation`. Returns `Ok(false)` when
    /// that generation is no longer current and the message was dropped.
    pub async fn send_for_generation(
        &self,
        generation: u64,
        message: &ParentMessage,
    ) -> Result<bool, PreviewError> {
        let value = message.encode()?;
        let mut state = self.state.lock().await;
        if generation != state.generation {
            tracing::debug!(
                kind = message.kind(),
                generation,
                current = state.generation,
                "Dropping message for stale preview generation",
            );
            return Ok(false);
        }
        if !state.ready {
            state.pending.push(value);
            return Ok(true);
        }
        let envelope = Envelope {
            generation,
            message: value,
        };
        if self.outbound.send(envelope).is_err() {
            tracing::warn!(kind = message.kind(), "Preview frame channel closed");
            return Ok(false);
        }
        Ok(true)
    }

    /// Accept a message from the frame.
    ///
    /// Stale and malformed messages are logged and dropped. `PREVIEW_READY`
    /// for the current generation flushes the queue.
    pub async fn handle_inbound(&self, envelope: Envelope) -> Option<PreviewMessage> {
        let mut state = self.state.lock().await;
        if envelope.generation != state.generation {
            let err = PreviewError::StaleGeneration {
                got: envelope.generation,
                current: state.generation,
            };
            tracing::debug!(error = %err, "Ignoring frame message");
            return None;
        }
        let message = match PreviewMessage::decode(&envelope.message) {
            Ok(m) => m,
            Err(e) => {
                let err = PreviewError::from(e);
                tracing::warn!(error = %err, "Dropping malformed frame message");
                return None;
            }
        };
        if message == PreviewMessage::PreviewReady && !state.ready {
            state.ready = true;
            let generation = state.generation;
            let pending = std::mem::take(&mut state.pending);
            tracing::info!(generation, flushed = pending.len(), "Preview ready");
            for value in pending {
                if self
                    .outbound
                    .send(Envelope {
                        generation,
                        message: value,
                    })
                    .is_err()
                {
                    tracing::warn!("Preview frame channel closed while flushing");
                    break;
                }
            }
        }
        Some(message)
    }
}

/// Frame side of the transport: posts messages to the editor, tagged
/// with the generation of the document it lives in.
#[derive(Debug, Clone)]
pub struct FrameEndpoint {
    generation: u64,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl FrameEndpoint {
    pub fn new(generation: u64, outbound: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            generation,
            outbound,
        }
    }

    /// Channel pair for frame → editor messages.
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(generation, tx), rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn post(&self, message: &PreviewMessage) {
        let value = match message.encode() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(kind = message.kind(), error = %e, "Failed to encode frame message");
                return;
            }
        };
        let envelope = Envelope {
            generation: self.generation,
            message: value,
        };
        if self.outbound.send(envelope).is_err() {
            tracing::debug!(kind = message.kind(), "Editor channel closed");
        }
    }
}
