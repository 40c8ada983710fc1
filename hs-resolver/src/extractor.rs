//! Document Extractor
//!
//! Turns a raw document body into named fields. Probes describe *what* they
//! want with static descriptors; the extractor decides *how* to find it.
//! `HtmlExtractor` implements descriptors as CSS selectors via `scraper`.

use scraper::{ElementRef, Html, Selector};

/// What to read from a matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Concatenated descendant text
    Text,
    /// Value of the named attribute
    Attr(&'static str),
}

/// Single-valued field: the first selector yielding a non-empty value wins
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub selectors: &'static [&'static str],
    pub target: Target,
}

impl FieldDescriptor {
    pub const fn text(selectors: &'static [&'static str]) -> Self {
        Self {
            selectors,
            target: Target::Text,
        }
    }

    pub const fn attr(selectors: &'static [&'static str], attr: &'static str) -> Self {
        Self {
            selectors,
            target: Target::Attr(attr),
        }
    }
}

/// Multi-valued field: every `attr` value of every element matching any selector
#[derive(Debug, Clone, Copy)]
pub struct LinkDescriptor {
    pub selectors: &'static [&'static str],
    pub attr: &'static str,
}

impl LinkDescriptor {
    pub const fn new(selectors: &'static [&'static str], attr: &'static str) -> Self {
        Self { selectors, attr }
    }
}

/// A document parsed once and queried with any number of descriptors
pub trait Document {
    /// First non-empty, trimmed value for the descriptor
    fn field(&self, field: &FieldDescriptor) -> Option<String>;

    /// All values for the descriptor, in selector then document order
    fn links(&self, links: &LinkDescriptor) -> Vec<String>;

    /// True when any of the descriptors yields a value
    fn has_any(&self, fields: &[FieldDescriptor]) -> bool {
        fields.iter().any(|field| self.field(field).is_some())
    }
}

/// Extract structured fields from a document body
pub trait Extractor: Send + Sync {
    /// Parse `body` once for repeated queries
    ///
    /// The returned document is not `Send`; query it between awaits.
    fn parse(&self, body: &str) -> Box<dyn Document>;

    /// One-shot `parse(body).field(field)`
    fn extract(&self, body: &str, field: &FieldDescriptor) -> Option<String> {
        self.parse(body).field(field)
    }

    /// One-shot `parse(body).links(links)`
    fn extract_all(&self, body: &str, links: &LinkDescriptor) -> Vec<String> {
        self.parse(body).links(links)
    }
}

/// CSS-selector based HTML extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn parse(&self, body: &str) -> Box<dyn Document> {
        Box::new(HtmlDocument(Html::parse_document(body)))
    }
}

/// Parsed HTML tree; invalid selectors are skipped
struct HtmlDocument(Html);

fn read_target(element: ElementRef<'_>, target: Target) -> Option<String> {
    let raw = match target {
        Target::Text => element.text().collect::<Vec<_>>().join(" "),
        Target::Attr(name) => element.value().attr(name)?.to_string(),
    };
    let compact = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!compact.is_empty()).then_some(compact)
}

impl Document for HtmlDocument {
    fn field(&self, field: &FieldDescriptor) -> Option<String> {
        field
            .selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|selector| {
                self.0
                    .select(&selector)
                    .find_map(|element| read_target(element, field.target))
            })
    }

    fn links(&self, links: &LinkDescriptor) -> Vec<String> {
        let mut out = Vec::new();
        for selector in links.selectors.iter().filter_map(|s| Selector::parse(s).ok()) {
            out.extend(
                self.0
                    .select(&selector)
                    .filter_map(|element| element.value().attr(links.attr))
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty()),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="card">
            <h1><span class="name">  Ann
               Lee </span></h1>
            <span class="empty"></span>
            <img class="avatar" src="https://cdn.example/a.png">
            <a href="https://x.com/annlee">x</a>
            <a href="/relative">rel</a>
            <a>no href</a>
          </div>
          <a href="https://outside.example">outside</a>
        </body></html>
    "#;

    #[test]
    fn test_text_is_whitespace_compacted() {
        let field = FieldDescriptor::text(&[".name"]);
        assert_eq!(HtmlExtractor.extract(PAGE, &field), Some("Ann Lee".to_string()));
    }

    #[test]
    fn test_falls_through_empty_and_invalid_selectors() {
        let field = FieldDescriptor::text(&["<<invalid>>", ".empty", ".missing", ".name"]);
        assert_eq!(HtmlExtractor.extract(PAGE, &field), Some("Ann Lee".to_string()));
    }

    #[test]
    fn test_attribute_target() {
        let field = FieldDescriptor::attr(&["img.avatar"], "src");
        assert_eq!(
            HtmlExtractor.extract(PAGE, &field),
            Some("https://cdn.example/a.png".to_string())
        );
        let missing = FieldDescriptor::attr(&["img.avatar"], "alt");
        assert_eq!(HtmlExtractor.extract(PAGE, &missing), None);
    }

    #[test]
    fn test_extract_all_scoped_in_document_order() {
        let links = LinkDescriptor::new(&[".card a"], "href");
        assert_eq!(
            HtmlExtractor.extract_all(PAGE, &links),
            vec!["https://x.com/annlee".to_string(), "/relative".to_string()]
        );
    }

    #[test]
    fn test_extract_all_empty_document() {
        let links = LinkDescriptor::new(&["a"], "href");
        assert!(HtmlExtractor.extract_all("", &links).is_empty());
    }

    #[test]
    fn test_parsed_document_answers_many_queries() {
        let doc = HtmlExtractor.parse(PAGE);
        assert_eq!(doc.field(&FieldDescriptor::text(&[".name"])).as_deref(), Some("Ann Lee"));
        assert_eq!(doc.links(&LinkDescriptor::new(&["body > a"], "href")), vec!["https://outside.example"]);
        assert!(doc.has_any(&[
            FieldDescriptor::text(&[".missing"]),
            FieldDescriptor::attr(&["img.avatar"], "src"),
        ]));
        assert!(!doc.has_any(&[FieldDescriptor::text(&[".empty"])]));
    }
}
