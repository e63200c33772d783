//! HTTP server for the live preview.
//!
//! Exposes the render endpoints the editor calls (`/preview`,
//! `/preview/widget`) and the global header/footer store, on top of
//! `pagewright-render` and `pagewright-db`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
