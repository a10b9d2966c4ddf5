//! Best-effort HTML document handling.
//!
//! Parsing is built on `scraper` (html5ever) and never fails: malformed
//! markup - missing closing tags, stray attributes - degrades gracefully.
//! The fetched source text is retained verbatim and attribute rewrites are
//! applied to it by exact substitution, so the serialized document is always
//! a superset of the input with only attribute values changed; no node is
//! ever lost to a parser round-trip.

use scraper::{Html, Selector};
use url::Url;

/// A parsed webpage, owned by exactly one capture operation.
///
/// The document is passed explicitly through each capture stage; there is no
/// shared parsed-document state anywhere in the engine.
#[derive(Debug, Clone)]
pub struct PageDocument {
    html: String,
    base: Url,
}

impl PageDocument {
    /// Parses fetched bytes. Invalid UTF-8 is decoded lossily and markup
    /// errors are recovered, never surfaced.
    #[must_use]
    pub fn parse(bytes: &[u8], base: Url) -> Self {
        let html = String::from_utf8_lossy(bytes).into_owned();
        Self { html, base }
    }

    /// The page's effective base URL, used to resolve relative references.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the values of `attr` across all `tag` elements carrying it,
    /// in document order.
    #[must_use]
    pub fn attribute_values(&self, tag: &str, attr: &str) -> Vec<String> {
        let document = Html::parse_document(&self.html);
        let Ok(selector) = Selector::parse(&format!("{tag}[{attr}]")) else {
            // Tag/attribute names come from the static target table; an
            // unparseable selector means there is nothing to find.
            return Vec::new();
        };
        document
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::to_string)
            .collect()
    }

    /// Rewrites every `attr="original"` (and single-quoted form) occurrence
    /// to carry `replacement` instead.
    pub fn rewrite_attribute(&mut self, attr: &str, original: &str, replacement: &str) {
        for quote in ['"', '\''] {
            let from = format!("{attr}={quote}{original}{quote}");
            let to = format!("{attr}={quote}{replacement}{quote}");
            self.html = self.html.replace(&from, &to);
        }
    }

    /// The (possibly rewritten) document, ready to persist.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.html.as_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(html: &str) -> PageDocument {
        PageDocument::parse(html.as_bytes(), Url::parse("https://example.com/page").unwrap())
    }

    #[test]
    fn test_serialization_preserves_input_verbatim() {
        let html = "<html><head><link href=\"a.css\"></head><body><p>hi</p></body></html>";
        let doc = page(html);
        assert_eq!(doc.as_bytes(), html.as_bytes());
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let doc = page("<html><body><p>unclosed<script src='x.js'>");
        assert_eq!(doc.attribute_values("script", "src"), vec!["x.js"]);
    }

    #[test]
    fn test_attribute_values_in_document_order() {
        let doc = page(
            "<link href=\"first.css\"><link rel=\"icon\"><link href=\"second.css\">\
             <script src=\"app.js\"></script>",
        );
        assert_eq!(
            doc.attribute_values("link", "href"),
            vec!["first.css", "second.css"]
        );
        assert_eq!(doc.attribute_values("script", "src"), vec!["app.js"]);
    }

    #[test]
    fn test_tags_without_the_attribute_are_skipped() {
        let doc = page("<script>inline()</script><script src=\"a.js\"></script>");
        assert_eq!(doc.attribute_values("script", "src"), vec!["a.js"]);
    }

    #[test]
    fn test_rewrite_double_quoted_attribute() {
        let mut doc = page("<link rel=\"stylesheet\" href=\"style.css\">");
        doc.rewrite_attribute("href", "style.css", "link/style.css");
        let html = String::from_utf8_lossy(doc.as_bytes()).into_owned();
        assert!(html.contains("<link rel=\"stylesheet\" href=\"link/style.css\">"));
    }

    #[test]
    fn test_rewrite_single_quoted_attribute() {
        let mut doc = page("<script src='app.js'></script>");
        doc.rewrite_attribute("src", "app.js", "script/app.js");
        assert!(
            String::from_utf8_lossy(doc.as_bytes()).contains("<script src='script/app.js'>")
        );
    }

    #[test]
    fn test_rewrite_leaves_other_attributes_alone() {
        let mut doc = page("<link href=\"a.css\"><link href=\"b.css\">");
        doc.rewrite_attribute("href", "a.css", "link/a.css");
        let html = String::from_utf8_lossy(doc.as_bytes()).into_owned();
        assert!(html.contains("href=\"link/a.css\""));
        assert!(html.contains("href=\"b.css\""));
    }

    #[test]
    fn test_lossy_decode_of_invalid_utf8() {
        let mut bytes = b"<html><body>".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"</body></html>");
        let doc = PageDocument::parse(&bytes, Url::parse("https://example.com").unwrap());
        assert!(String::from_utf8_lossy(doc.as_bytes()).contains('\u{FFFD}'));
    }
}
