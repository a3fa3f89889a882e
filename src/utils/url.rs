// src/utils/url.rs

//! URL manipulation utilities.

use regex::Regex;
use url::Url;

use crate::error::Result;

/// Resolve a potentially relative URL against a base URL.
///
/// Returns `None` for hrefs that do not lead to a fetchable http(s) page
/// (`mailto:`, `javascript:`, bare fragments).
///
/// # Examples
/// ```
/// use crawl_gateway::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/path/", "page.html"),
///     Some("https://example.com/path/page.html".to_string())
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let base = Url::parse(base).ok()?;
    let mut joined = base.join(href).ok()?;
    if !matches!(joined.scheme(), "http" | "https") {
        return None;
    }
    joined.set_fragment(None);
    Some(joined.to_string())
}

/// Canonical form used to detect already-visited pages.
pub fn normalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    let mut normalized = parsed.to_string();
    if normalized.ends_with('/') && parsed.path() != "/" {
        normalized.pop();
    }
    Some(normalized)
}

/// Extract domain from a URL.
///
/// # Examples
/// ```
/// use crawl_gateway::utils::url::get_domain;
///
/// assert_eq!(
///     get_domain("https://Example.COM/path"),
///     Some("example.com".to_string())
/// );
/// ```
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Whether two URLs share a host.
pub fn same_domain(a: &str, b: &str) -> bool {
    match (get_domain(a), get_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Number of non-empty path segments.
pub fn path_depth(url: &str) -> usize {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).count())
        })
        .unwrap_or(0)
}

/// First path segment as a grouping key (`/` for the root).
pub fn section_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()).map(|s| format!("/{s}")))
        })
        .unwrap_or_else(|| "/".to_string())
}

/// Compile a shell-style URL pattern (`*docs*`) into a regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Ok(Regex::new(&format!("^{}$", escaped.join(".*")))?)
}
