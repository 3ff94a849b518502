//! Root descriptor for a crawl session and the URL normalization helpers
//! shared by the link extractor, the classifier and the robots filter.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use url::Url;

/// Canonical form of the site's seed URL.
///
/// `url` is the validated, lower-cased root (scheme, host, optional port and
/// path, never a trailing slash) and the prefix depth is measured from.
/// Host-relative links resolve against `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDescriptor {
    url: String,
    origin: String,
    host: String,
    path: String,
}

impl RootDescriptor {
    /// Validate a user-supplied root URL and build its descriptor.
    ///
    /// Whitespace is trimmed, the input lower-cased, and `http://` is assumed
    /// when no scheme is given. Host and path are kept as written.
    /// Roots without a host or carrying a query string are rejected. A final
    /// file segment (`/blog/index.html`) and a trailing `/` are dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = ensure_scheme(&input.trim().to_lowercase());

        // Validation only: `Url` punycodes hosts and percent-encodes paths,
        // while candidate links are compared as written.
        let parsed = Url::parse(&raw)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", input.trim(), e)))?;

        let (host, raw_path) = split_host_path(&raw);
        if host.is_empty() || parsed.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidUrl(format!(
                "{}: missing host",
                input.trim()
            )));
        }

        if parsed.query().is_some() {
            return Err(ScanError::InvalidUrl(format!(
                "{}: root URL must not contain a query",
                input.trim()
            )));
        }

        let host = host.to_string();
        let path = trim_root_path(raw_path).to_string();

        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        let origin = format!("{}://{}", parsed.scheme(), authority);
        let url = format!("{}{}", origin, path);

        Ok(Self {
            url,
            origin,
            host,
            path,
        })
    }

    /// The root URL as stored in the frontier.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Scheme, host and port, without the path.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Host without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path component, empty for a bare domain.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// `<host-without-port><path>`, the form the classifier matches on.
    pub fn comparison_form(&self) -> String {
        format!("{}{}", self.host, self.path)
    }

    /// Comparison form with a leading `www.` removed.
    pub fn bare_form(&self) -> String {
        strip_www(&self.comparison_form()).to_string()
    }

    /// Resolve a host-relative reference (`/about`) against the root's origin.
    pub fn resolve(&self, reference: &str) -> String {
        format!("{}{}", self.origin, reference)
    }

    /// Number of `/` separators after the root prefix.
    pub fn depth_of(&self, url: &str) -> usize {
        url.as_bytes()
            .get(self.url.len()..)
            .map(|rest| rest.iter().filter(|b| **b == b'/').count())
            .unwrap_or(0)
    }
}

impl std::fmt::Display for RootDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn trim_root_path(path: &str) -> &str {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    if last_segment.contains('.') {
        match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        }
    } else {
        path.strip_suffix('/').unwrap_or(path)
    }
}

/// Prepend `http://` unless the value already names an http(s) scheme.
pub fn ensure_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

pub fn strip_www(form: &str) -> &str {
    form.strip_prefix("www.").unwrap_or(form)
}

/// Split an absolute URL into `(host-without-port, path)`.
///
/// This is deliberately lenient: link values are arbitrary page content and
/// must classify even when a strict URL parser would reject them.
pub fn split_host_path(url: &str) -> (&str, &str) {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host = match authority.find(':') {
        Some(idx) => &authority[..idx],
        None => authority,
    };

    let after_authority = &rest[authority_end..];
    let path = if after_authority.starts_with('/') {
        let end = after_authority.find(['?', '#']).unwrap_or(after_authority.len());
        &after_authority[..end]
    } else {
        ""
    };

    (host, path)
}

/// `<host-without-port><path>` for a candidate link.
pub fn comparison_form(url: &str) -> String {
    let with_scheme = ensure_scheme(url);
    let (host, path) = split_host_path(&with_scheme);
    format!("{}{}", host, path)
}

/// Path plus query of an absolute URL, as matched by robots.txt rules.
pub fn path_and_query(url: &str) -> &str {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);

    match rest.find(['/', '?']) {
        Some(idx) => {
            let tail = &rest[idx..];
            match tail.find('#') {
                Some(end) => &tail[..end],
                None => tail,
            }
        }
        None => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adds_scheme_and_strips_slash() {
        let root = RootDescriptor::parse("  Example.com/  ").unwrap();
        assert_eq!(root.url(), "http://example.com");
        assert_eq!(root.host(), "example.com");
        assert_eq!(root.path(), "");
        assert!(!root.has_path());
    }

    #[test]
    fn test_parse_keeps_port_in_url_but_not_host() {
        let root = RootDescriptor::parse("http://localhost:8080/blog/").unwrap();
        assert_eq!(root.url(), "http://localhost:8080/blog");
        assert_eq!(root.host(), "localhost");
        assert_eq!(root.origin(), "http://localhost:8080");
        assert_eq!(root.comparison_form(), "localhost/blog");
    }

    #[test]
    fn test_parse_drops_index_file() {
        let root = RootDescriptor::parse("https://example.com/docs/index.html").unwrap();
        assert_eq!(root.url(), "https://example.com/docs");
        assert_eq!(root.path(), "/docs");

        let root = RootDescriptor::parse("https://example.com/index.php").unwrap();
        assert_eq!(root.url(), "https://example.com");
    }

    #[test]
    fn test_parse_keeps_unicode_host_and_path() {
        let root = RootDescriptor::parse("Bücher.de/Bücher/").unwrap();
        assert_eq!(root.url(), "http://bücher.de/bücher");
        assert_eq!(root.host(), "bücher.de");
        assert_eq!(root.comparison_form(), "bücher.de/bücher");
    }

    #[test]
    fn test_parse_rejects_query() {
        assert!(matches!(
            RootDescriptor::parse("http://example.com/?page=1"),
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_host() {
        assert!(RootDescriptor::parse("http://").is_err());
        assert!(RootDescriptor::parse("").is_err());
    }

    #[test]
    fn test_bare_form_strips_www() {
        let root = RootDescriptor::parse("www.example.com").unwrap();
        assert_eq!(root.comparison_form(), "www.example.com");
        assert_eq!(root.bare_form(), "example.com");
    }

    #[test]
    fn test_depth_counts_separators_after_root() {
        let root = RootDescriptor::parse("http://example.com").unwrap();
        assert_eq!(root.depth_of("http://example.com"), 0);
        assert_eq!(root.depth_of("http://example.com/about"), 1);
        assert_eq!(root.depth_of("http://example.com/a/b/c"), 3);
        assert_eq!(root.depth_of("http://ex"), 0);
    }

    #[test]
    fn test_split_host_path() {
        assert_eq!(
            split_host_path("http://example.com:80/a/b?x=1#frag"),
            ("example.com", "/a/b")
        );
        assert_eq!(split_host_path("https://example.com"), ("example.com", ""));
        assert_eq!(split_host_path("http://example.com?x"), ("example.com", ""));
    }

    #[test]
    fn test_comparison_form_assumes_http() {
        assert_eq!(comparison_form("example.com/page"), "example.com/page");
        assert_eq!(comparison_form("https://www.example.com:443/x"), "www.example.com/x");
    }

    #[test]
    fn test_path_and_query() {
        assert_eq!(path_and_query("http://example.com/a?b=1#c"), "/a?b=1");
        assert_eq!(path_and_query("http://example.com"), "/");
        assert_eq!(path_and_query("http://example.com?q"), "?q");
    }
}
