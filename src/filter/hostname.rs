use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Fallback for inputs the URL parser rejects: an optional scheme and
/// userinfo, then the host up to the first `/`, `?`, `#` or `:port`.
static HOST_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:[a-z][a-z0-9+.\-]*://)?(?:[^@/\s]*@)?([^/\s?#:@]+)(?::\d+)?(?:[/?#]|$)")
        .expect("host fallback pattern is valid")
});

/// Schemes that never expose per-origin storage.
const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "view-source:",
    "data:",
    "javascript:",
];

/// Canonical lowercase hostname for a URL or bare host.
///
/// Returns an empty string when nothing host-like can be extracted.
pub fn normalize(url_or_host: &str) -> String {
    let input = url_or_host.trim();
    if input.is_empty() {
        return String::new();
    }

    if let Ok(url) = Url::parse(input) {
        if let Some(host) = url.host_str() {
            return host.trim().to_lowercase();
        }
    }

    HOST_FALLBACK
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .unwrap_or_default()
}

/// Whether a URL points at a page whose storage cannot be sampled
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.trim();
    url.is_empty() || RESTRICTED_PREFIXES.iter().any(|p| url.starts_with(p))
}

/// Whether a URL is a web page the coordinator samples (http/https only)
pub fn is_scannable_url(url: &str) -> bool {
    if is_restricted_url(url) {
        return false;
    }
    matches!(
        Url::parse(url.trim()).map(|u| u.scheme().to_string()).as_deref(),
        Ok("http") | Ok("https")
    )
}
