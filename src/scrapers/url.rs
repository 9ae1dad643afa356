//! URL and title normalization for listing candidates.

use url::Url;

use crate::cleaning::collapse_whitespace;

/// Resolve `href` against `base` and reduce it to `scheme://host/path`.
///
/// Query strings and fragments are dropped and a trailing slash is trimmed,
/// so the same movie reached through different links yields one key.
/// Returns `None` for empty, unparseable, or non-http(s) links.
pub fn normalize_url(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);

    let normalized = url.as_str().trim_end_matches('/').to_string();
    Some(normalized)
}

/// Comparison key for titles: lowercase, whitespace-collapsed, punctuation removed.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    collapse_whitespace(&stripped)
}
