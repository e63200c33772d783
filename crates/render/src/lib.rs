//! Server-side HTML rendering for widgets and full preview pages.
//!
//! All output goes through [`html::HtmlWriter`], which escapes text and
//! attribute values by default. The only way to emit markup verbatim is
//! [`html::HtmlWriter::trusted`], which takes a sanitizer-produced
//! [`SafeHtml`](pagewright_core::sanitize::SafeHtml).

pub mod html;
pub mod page;
pub mod widget;

pub use page::{PageOptions, PageRenderer};
pub use widget::{RenderContext, WidgetRenderer};
