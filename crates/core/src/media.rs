//! Media path resolution.
//!
//! Stored widget data references uploads by project-relative path
//! (`/uploads/images/a.png`). At render time those paths are rewritten to
//! the media endpoint so the browser can fetch them.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::sanitize::{escape_attr, SafeHtml};

/// Prefix of project-relative upload paths.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Rewrites `/uploads/...` references for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolver {
    /// `{media_endpoint}/{project_id}` without a trailing slash.
    base: String,
}

impl MediaResolver {
    pub fn new(media_endpoint: &str, project_id: &str) -> Self {
        Self {
            base: format!("{}/{}", media_endpoint.trim_end_matches('/'), project_id),
        }
    }

    /// Resolver that leaves paths unchanged.
    pub fn passthrough() -> Self {
        Self {
            base: String::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Rewrite a single path. Anything that is not an upload path is
    /// returned as-is.
    pub fn resolve(&self, path: &str) -> String {
        if self.base.is_empty() || !path.starts_with(UPLOADS_PREFIX) {
            return path.to_string();
        }
        format!("{}{}", self.base, path)
    }

    /// Rewrite upload paths inside `src`/`href` attributes of sanitized
    /// rich text.
    pub fn rewrite_html(&self, html: &SafeHtml) -> SafeHtml {
        if self.base.is_empty() {
            return html.clone();
        }
        static ATTR: OnceLock<Regex> = OnceLock::new();
        let attr = ATTR.get_or_init(|| {
            Regex::new(r#"\b(src|href)="(/uploads/[^"]*)""#).expect("valid regex")
        });
        let rewritten = attr.replace_all(html.as_str(), |caps: &Captures| {
            format!(
                "{}=\"{}{}\"",
                &caps[1],
                escape_attr(&self.base),
                &caps[2]
            )
        });
        SafeHtml::from_sanitized(rewritten.into_owned())
    }
}
