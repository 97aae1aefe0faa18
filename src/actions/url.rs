//! Decides whether a decoded payload is something to open in a browser.

use regex::Regex;
use std::sync::LazyLock;

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").unwrap());

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s/?#@]+(?:[/?#]\S*)?$").unwrap());

static WWW_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^www\.[^\s/?#]+(?:[/?#]\S*)?$").unwrap());

/// Returns a browser-ready URL for `raw`, or `None` if it is not a web link.
///
/// `http`/`https` URLs pass through trimmed, bare `www.` hosts get an
/// `https://` prefix, any other scheme (`mailto:`, `WIFI:`, ...) is text.
pub fn normalize_http_url(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if SCHEME.is_match(value) {
        return HTTP_URL.is_match(value).then(|| value.to_string());
    }

    WWW_HOST
        .is_match(value)
        .then(|| format!("https://{value}"))
}
