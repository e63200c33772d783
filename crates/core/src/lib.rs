//! Pagewright core domain types and pure logic.
//!
//! Everything the server-side renderer and the client-side preview layer
//! share lives here: the widget/page data model, schema registry,
//! sanitization, theme CSS-variable projection, the preview message
//! protocol and the snapshot diffing used by reconciliation.

pub mod css_vars;
pub mod diff;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod media;
pub mod page;
pub mod protocol;
pub mod sanitize;
pub mod schema;
pub mod snapshot;
pub mod theme;
pub mod types;
pub mod widget;
pub mod wire;
