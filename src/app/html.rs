use scraper::{ElementRef, Html, Selector};

use super::error::AnalysisError;

/// A parsed HTML document. Malformed markup is repaired by the parser, so the
/// only rejected inputs are empty or binary bodies.
pub struct ParsedPage {
    doc: Html,
}

impl ParsedPage {
    pub fn parse(body: &[u8]) -> Result<Self, AnalysisError> {
        if body.contains(&0) {
            return Err(AnalysisError::ParseFailed(
                "body looks like binary data".to_string(),
            ));
        }
        let html = String::from_utf8_lossy(body);
        if html.trim().is_empty() {
            return Err(AnalysisError::ParseFailed("empty document".to_string()));
        }

        Ok(Self {
            doc: Html::parse_document(&html),
        })
    }

    /// Elements matching a CSS selector. An invalid selector matches nothing.
    pub fn select<'a>(&'a self, selector: &str) -> Vec<ElementRef<'a>> {
        match Selector::parse(selector) {
            Ok(selector) => self.doc.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, selector: &str) -> usize {
        Selector::parse(selector)
            .ok()
            .map(|sel| self.doc.select(&sel).count())
            .unwrap_or(0)
    }

    pub fn exists(&self, selector: &str) -> bool {
        Selector::parse(selector)
            .ok()
            .map(|sel| self.doc.select(&sel).next().is_some())
            .unwrap_or(false)
    }

    pub fn first_text(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        self.doc
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        self.doc
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(ToString::to_string)
    }

    /// All text outside `script`, `style` and friends. Inline markup joins its text
    /// directly, so `Up<b>time</b>` stays one word; block elements are padded
    /// with spaces.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        collect_text(self.doc.root_element(), &mut out);
        out
    }
}

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "div", "dl",
    "dt", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th",
    "title", "tr", "ul", "option",
];

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push(' ');
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            collect_text(child, out);
        }
    }
    if block {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_script_and_style() {
        let page = ParsedPage::parse(
            br#"<html><head><style>body { color: red }</style>
            <script>var hidden = "nope";</script></head>
            <body><p>Hello <b>world</b></p><script>alert(1)</script></body></html>"#,
        )
        .unwrap();
        let text = page.visible_text();
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("color"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        let page = ParsedPage::parse(b"<p>Up<b>time</b> moni<i>toring</i> works</p>").unwrap();
        let text = page.visible_text();
        assert_eq!(
            text.split_whitespace().collect::<Vec<_>>(),
            vec!["Uptime", "monitoring", "works"]
        );
    }

    #[test]
    fn block_elements_separate_words() {
        let page = ParsedPage::parse(b"<ul><li>one</li><li>two</li></ul><div>three<br>four</div>")
            .unwrap();
        assert_eq!(page.visible_text().split_whitespace().count(), 4);
    }

    #[test]
    fn adjacent_elements_do_not_merge_words() {
        let page = ParsedPage::parse(b"<h1>Heading</h1><p>para</p>").unwrap();
        assert_eq!(page.visible_text().split_whitespace().count(), 2);
    }

    #[test]
    fn malformed_markup_still_parses() {
        let page = ParsedPage::parse(b"<html><body><h1>Open <p>never closed <img src=x").unwrap();
        assert_eq!(page.count("h1"), 1);
        assert!(page.visible_text().contains("never closed"));
    }

    #[test]
    fn empty_or_binary_bodies_fail() {
        assert!(matches!(
            ParsedPage::parse(b"   \n "),
            Err(AnalysisError::ParseFailed(_))
        ));
        assert!(matches!(
            ParsedPage::parse(&[0x89, b'P', b'N', b'G', 0, 0]),
            Err(AnalysisError::ParseFailed(_))
        ));
    }

    #[test]
    fn attribute_queries() {
        let page = ParsedPage::parse(
            br#"<head><meta name="description" content="About us"><link rel="shortcut icon" href="/f.ico"></head>"#,
        )
        .unwrap();
        assert_eq!(
            page.first_attr(r#"meta[name="description"]"#, "content"),
            Some("About us".to_string())
        );
        assert!(page.exists(r#"link[rel~="icon"]"#));
        assert!(!page.exists(r#"meta[name="viewport"]"#));
        assert_eq!(page.count("not a [valid selector"), 0);
    }
}
