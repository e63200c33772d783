//! Setting sanitization.
//!
//! [`sanitize`] is total: any stored value maps to a typed
//! [`SanitizedValue`], falling back to the schema default (itself
//! sanitized) and finally to [`SanitizedValue::Empty`]. Rich text comes out
//! as [`SafeHtml`], which only this module can construct, so renderers
//! cannot emit unsanitized markup for a `richtext` setting.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::fonts::FontValue;
use crate::schema::{SettingSchema, SettingType};

/// Tags kept by the rich-text sanitizer. Everything else is dropped (its
/// text content survives, escaped).
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i",
    "img", "li", "ol", "p", "pre", "s", "small", "span", "strong", "sub", "sup", "u", "ul",
];

/// Tags removed together with everything between their open and close tags.
const STRIPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "title",
];

/// Void elements never get a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// URL schemes permitted in links and media references.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// HTML that has passed the rich-text allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wrap markup produced by a transformation of already-sanitized HTML
    /// that only rewrites attribute values it re-escapes.
    pub(crate) fn from_sanitized(html: String) -> Self {
        Self(html)
    }
}

/// A link whose `href` passed the protocol check (or was blanked).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeLink {
    /// Checked URL; empty when the stored URL used a forbidden scheme.
    pub href: String,
    pub text: String,
    pub open_in_new_tab: bool,
}

/// Sanitized, typed value of one setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SanitizedValue {
    /// Plain text. Escaped by the HTML writer, never trusted.
    Text(String),
    Html(SafeHtml),
    Link(SafeLink),
    /// Hex colour, `#rgb`/`#rgba`/`#rrggbb`/`#rrggbbaa`.
    Color(String),
    /// Reference to a theme setting, written `@group.id`.
    ThemeColor { group: String, id: String },
    Number(f64),
    Choice(String),
    Flag(bool),
    /// Checked media path or URL.
    Media(String),
    Code(String),
    Font(FontValue),
    Empty,
}

impl SanitizedValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Sanitize one setting value according to its declared type.
///
/// Invalid or missing input falls back to the schema default; if that is
/// also unusable the result is [`SanitizedValue::Empty`].
pub fn sanitize(value: Option<&Value>, setting: &SettingSchema) -> SanitizedValue {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| sanitize_value(v, setting))
        .or_else(|| {
            setting
                .default
                .as_ref()
                .and_then(|d| sanitize_value(d, setting))
        })
        .unwrap_or(SanitizedValue::Empty)
}

fn sanitize_value(value: &Value, setting: &SettingSchema) -> Option<SanitizedValue> {
    match setting.setting_type {
        SettingType::Text | SettingType::Textarea => plain_text(value).map(SanitizedValue::Text),
        SettingType::Richtext => {
            let raw = plain_text(value)?;
            Some(SanitizedValue::Html(sanitize_html(&raw)))
        }
        SettingType::Link => sanitize_link(value).map(SanitizedValue::Link),
        SettingType::Color => sanitize_color(value),
        SettingType::Number | SettingType::Range => {
            sanitize_number(value, setting.min, setting.max).map(SanitizedValue::Number)
        }
        SettingType::Select | SettingType::Radio => {
            let choice = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            setting
                .has_option(&choice)
                .then_some(SanitizedValue::Choice(choice))
        }
        SettingType::Checkbox => match value {
            Value::Bool(b) => Some(SanitizedValue::Flag(*b)),
            Value::String(s) if s == "true" => Some(SanitizedValue::Flag(true)),
            Value::String(s) if s == "false" => Some(SanitizedValue::Flag(false)),
            _ => None,
        },
        SettingType::Image | SettingType::Video | SettingType::Audio => {
            let raw = match value {
                Value::String(s) => s.as_str(),
                Value::Object(map) => map.get("src").and_then(Value::as_str)?,
                _ => return None,
            };
            if raw.trim().is_empty() {
                return None;
            }
            safe_url(raw).map(SanitizedValue::Media)
        }
        SettingType::Code => value.as_str().map(|s| SanitizedValue::Code(s.to_string())),
        SettingType::FontPicker => FontValue::from_value(value).map(SanitizedValue::Font),
    }
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn sanitize_link(value: &Value) -> Option<SafeLink> {
    let (href, text, new_tab) = match value {
        Value::String(s) => (s.as_str(), String::new(), false),
        Value::Object(map) => (
            map.get("href").and_then(Value::as_str).unwrap_or_default(),
            map.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            map.get("target").and_then(Value::as_str) == Some("_blank"),
        ),
        _ => return None,
    };
    Some(SafeLink {
        // A forbidden scheme blanks the href rather than reverting to the default.
        href: safe_url(href).unwrap_or_default(),
        text,
        open_in_new_tab: new_tab,
    })
}

fn sanitize_color(value: &Value) -> Option<SanitizedValue> {
    let raw = value.as_str()?.trim();
    if let Some(reference) = raw.strip_prefix('@') {
        let (group, id) = reference.split_once('.')?;
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        return (valid(group) && valid(id)).then(|| SanitizedValue::ThemeColor {
            group: group.to_string(),
            id: id.to_string(),
        });
    }
    is_hex_color(raw).then(|| SanitizedValue::Color(raw.to_ascii_lowercase()))
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn sanitize_number(value: &Value, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let n = min.map_or(n, |m| n.max(m));
    Some(max.map_or(n, |m| n.min(m)))
}

/// Check a URL's scheme. Relative URLs pass; absolute URLs must use an
/// allowed scheme. Returns the trimmed URL, or `None` when forbidden.
pub fn safe_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // Browsers ignore control characters and whitespace inside the scheme,
    // so `java\tscript:` must be caught too.
    let decoded = decode_entities(trimmed);
    let compact: String = decoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();

    let scheme_end = compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            ALLOWED_SCHEMES
                .contains(&scheme.as_str())
                .then(|| decoded.trim().to_string())
        }
        _ => Some(decoded.trim().to_string()),
    }
}

/// Decode the entities commonly used to smuggle schemes past filters.
fn decode_entities(s: &str) -> String {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    let numeric = NUMERIC.get_or_init(|| {
        Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));?").expect("valid regex")
    });
    let decoded = numeric.replace_all(s, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    decoded
        .replace("&colon;", ":")
        .replace("&Tab;", "\t")
        .replace("&NewLine;", "\n")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Escape text for use inside an HTML element.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use inside a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn stripped_block_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        STRIPPED_WITH_CONTENT
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</\s*{tag}\s*>")).expect("valid regex")
            })
            .collect()
    })
}

fn comment_pattern() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?(-->|$)").expect("valid regex"))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^<>]*)>").expect("valid regex"))
}

fn attr_pattern() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
            .expect("valid regex")
    })
}

/// Reduce arbitrary HTML to the rich-text allowlist.
pub fn sanitize_html(raw: &str) -> SafeHtml {
    let mut html = comment_pattern().replace_all(raw, "").into_owned();
    for pattern in stripped_block_patterns() {
        html = pattern.replace_all(&html, "").into_owned();
    }

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in tag_pattern().captures_iter(&html) {
        let whole = caps.get(0).expect("group 0 always matches");
        out.push_str(&escape_text_segment(&html[last..whole.start()]));
        last = whole.end();

        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&tag.as_str()) {
            continue;
        }
        if closing {
            if !VOID_TAGS.contains(&tag.as_str()) {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            continue;
        }
        out.push('<');
        out.push_str(&tag);
        out.push_str(&allowed_attributes(&tag, &caps[3]));
        out.push('>');
    }
    out.push_str(&escape_text_segment(&html[last..]));

    SafeHtml(out)
}

/// Text between tags: any stray angle bracket is escaped so it can never
/// open an element. Existing entities are left intact.
fn escape_text_segment(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

fn allowed_attributes(tag: &str, raw_attrs: &str) -> String {
    let mut out = String::new();
    let mut opens_new_tab = false;
    for caps in attr_pattern().captures_iter(raw_attrs) {
        let name = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let kept = match (tag, name.as_str()) {
            ("a", "href") | ("img", "src") => safe_url(value),
            ("a", "target") => {
                opens_new_tab = value == "_blank";
                opens_new_tab.then(|| value.to_string())
            }
            ("a", "title") | ("img", "alt") | ("img", "title") => Some(decode_entities(value)),
            ("img", "width") | ("img", "height") => value
                .chars()
                .all(|c| c.is_ascii_digit())
                .then(|| value.to_string()),
            (_, "class") => Some(
                value
                    .split_whitespace()
                    .filter(|c| {
                        c.chars()
                            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            )
            .filter(|c| !c.is_empty()),
            _ => None,
        };

        if let Some(v) = kept {
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            out.push_str(&escape_attr(&v));
            out.push('"');
        }
    }
    if opens_new_tab {
        out.push_str(" rel=\"noopener noreferrer\"");
    }
    out
}
