use crate::root::RootDescriptor;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// Collect the links of every `<a href>` on a page.
///
/// Values are lower-cased before anything else, so dedup is case-insensitive
/// and case-sensitive paths collapse. Host-relative values are resolved
/// against the root's origin; anything without an http(s) scheme gets `http://`.
pub fn extract_links(html: &str, root: &RootDescriptor) -> HashSet<String> {
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| normalize_href(href, root))
        .collect()
}

/// Turn one raw `href` value into the frontier's absolute form.
pub fn normalize_href(href: &str, root: &RootDescriptor) -> Option<String> {
    let href = href.trim().to_lowercase();

    // Skip empty, javascript:, mailto:, tel:, fragments
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let absolute = if href.starts_with('/') {
        root.resolve(&href)
    } else {
        href
    };

    if absolute.contains("http://") || absolute.contains("https://") {
        Some(absolute)
    } else {
        Some(format!("http://{}", absolute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> RootDescriptor {
        RootDescriptor::parse("http://example.com").unwrap()
    }

    #[test]
    fn test_extracts_only_anchor_hrefs() {
        let html = r#"<html><head>
                <link href="/style.css" rel="stylesheet">
                <script src="/app.js"></script>
            </head><body>
                <a href="/about">About</a>
                <img src="/logo.png">
                <a>No href</a>
            </body></html>"#;

        let links = extract_links(html, &root());
        assert_eq!(links.len(), 1);
        assert!(links.contains("http://example.com/about"));
    }

    #[test]
    fn test_lowercases_and_dedups() {
        let html = r#"<a href="/About">A</a><a href="/about">a</a><a href="HTTP://Other.com/X">X</a>"#;

        let links = extract_links(html, &root());
        assert_eq!(links.len(), 2);
        assert!(links.contains("http://example.com/about"));
        assert!(links.contains("http://other.com/x"));
    }

    #[test]
    fn test_prepends_scheme() {
        let html = r#"<a href="www.example.com/contact">C</a><a href="https://secure.example.com">S</a>"#;

        let links = extract_links(html, &root());
        assert!(links.contains("http://www.example.com/contact"));
        assert!(links.contains("https://secure.example.com"));
    }

    #[test]
    fn test_skips_non_page_hrefs() {
        let html = r##"<a href="#top">T</a><a href="">E</a><a href="mailto:a@b.c">M</a>
            <a href="javascript:void(0)">J</a><a href="tel:123">P</a>"##;

        assert!(extract_links(html, &root()).is_empty());
    }

    #[test]
    fn test_resolves_against_root_with_path() {
        let root = RootDescriptor::parse("http://example.com:8080/blog").unwrap();
        assert_eq!(
            normalize_href("/blog/post-1", &root).unwrap(),
            "http://example.com:8080/blog/post-1"
        );
    }
}
