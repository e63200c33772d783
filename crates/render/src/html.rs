//! Escaping HTML writer.

use pagewright_core::sanitize::{escape_attr, escape_html, SafeHtml};

/// Void elements that must not have closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements a schema may choose for text-like settings.
const TEXT_ELEMENTS: &[&str] = &[
    "blockquote", "div", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6", "label", "li", "p",
    "small", "span", "strong",
];

/// Map a schema-declared element name onto an allowed text element,
/// falling back to `fallback`.
pub fn text_element<'a>(declared: Option<&'a str>, fallback: &'a str) -> &'a str {
    match declared {
        Some(tag) if TEXT_ELEMENTS.contains(&tag) => tag,
        _ => fallback,
    }
}

/// Builds an HTML string. Text and attribute values are always escaped.
#[derive(Debug, Default)]
pub struct HtmlWriter {
    buf: String,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
        }
    }

    /// Open `tag` with attributes in the given order.
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (name, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(name);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape_attr(value));
            self.buf.push('"');
        }
        self.buf.push('>');
        self
    }

    pub fn close(&mut self, tag: &str) -> &mut Self {
        if !VOID_ELEMENTS.contains(&tag) {
            self.buf.push_str("</");
            self.buf.push_str(tag);
            self.buf.push('>');
        }
        self
    }

    /// `<tag attrs>escaped text</tag>`.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        self.open(tag, attrs).text(text).close(tag)
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(&escape_html(text));
        self
    }

    /// Emit sanitized rich text verbatim.
    pub fn trusted(&mut self, html: &SafeHtml) -> &mut Self {
        self.buf.push_str(html.as_str());
        self
    }

    /// Emit markup produced by another writer.
    pub fn fragment(&mut self, rendered: &str) -> &mut Self {
        self.buf.push_str(rendered);
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::sanitize::sanitize_html;

    #[test]
    fn escapes_text_and_attributes() {
        let mut w = HtmlWriter::new();
        w.element("p", &[("title", "\"quoted\" & <b>")], "<script>alert(1)</script>");
        assert_eq!(
            w.finish(),
            "<p title=\"&quot;quoted&quot; &amp; &lt;b&gt;\">&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut w = HtmlWriter::new();
        w.open("img", &[("src", "/a.png")]).close("img");
        assert_eq!(w.finish(), "<img src=\"/a.png\">");
    }

    #[test]
    fn trusted_emits_sanitized_markup() {
        let mut w = HtmlWriter::new();
        w.trusted(&sanitize_html("<em>hi</em><script>x</script>"));
        assert_eq!(w.finish(), "<em>hi</em>");
    }

    #[test]
    fn text_element_falls_back_for_unknown_tags() {
        assert_eq!(text_element(Some("h1"), "div"), "h1");
        assert_eq!(text_element(Some("script"), "div"), "div");
        assert_eq!(text_element(None, "span"), "span");
    }
}
