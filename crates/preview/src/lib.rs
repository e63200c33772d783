//! Client side of the live preview.
//!
//! The editor owns a [`session::PreviewSession`]. For every new editor
//! snapshot the session either reloads the whole preview document (on a
//! structural change) or hands the snapshot to the
//! [`engine::ReconciliationEngine`], which re-renders only the widgets
//! that changed and morphs them in place. All communication with the
//! preview document goes through generation-tagged messages
//! ([`transport`]); inside the document the [`runtime::PreviewRuntime`]
//! applies them. The [`overlay::Overlay`] draws selection and hover boxes
//! from the bounds the runtime reports.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod runtime;
pub mod session;
pub mod transport;

pub use client::{HttpRenderSource, LocalRenderSource, RenderSource};
pub use config::PreviewConfig;
pub use engine::{ReconcileReport, ReconciliationEngine};
pub use error::PreviewError;
pub use overlay::{Overlay, OverlayBox};
pub use runtime::{MemoryDom, MemoryNode, PreviewDom, PreviewRuntime};
pub use session::{EditorCommand, FrameHost, PreviewSession, PreviewStatus, UpdateOutcome};
pub use transport::{Envelope, FrameEndpoint, PreviewPort};
