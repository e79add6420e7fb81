//! Endpoint URL helpers.

use std::sync::OnceLock;

use regex::Regex;

static SCHEME: OnceLock<Regex> = OnceLock::new();
static SCHEME_PREFIX: OnceLock<Regex> = OnceLock::new();

fn scheme() -> &'static Regex {
    SCHEME.get_or_init(|| Regex::new(r"^https?://").expect("static regex"))
}

fn scheme_prefix() -> &'static Regex {
    SCHEME_PREFIX.get_or_init(|| Regex::new(r"^https?:").expect("static regex"))
}

/// Joins a host and an endpoint path.
///
/// A host without an `http://` or `https://` scheme becomes protocol-relative
/// (`//host`). A single leading slash on `path` is stripped so the join never
/// produces a double slash.
///
/// # Examples
///
/// ```
/// use heimdallr::url::format_url_path;
///
/// assert_eq!(format_url_path("example.com", "/init"), "//example.com/init");
/// assert_eq!(format_url_path("https://example.com", "init"), "https://example.com/init");
/// ```
#[must_use]
pub fn format_url_path(host: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    if scheme().is_match(host) {
        format!("{host}/{path}")
    } else {
        format!("//{host}/{path}")
    }
}

/// Returns the scheme-less path of a URL without query string or trailing slash.
///
/// ```
/// use heimdallr::url::get_url_path;
///
/// assert_eq!(get_url_path("https://example.com/log/?id=1"), "//example.com/log");
/// ```
#[must_use]
pub fn get_url_path(url: &str) -> String {
    let without_scheme = scheme_prefix().replace(url, "");
    let path = without_scheme.split('?').next().unwrap_or_default();
    path.strip_suffix('/').unwrap_or(path).to_string()
}
