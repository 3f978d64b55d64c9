//! URL normalization and structural facts.
//!
//! Nothing here fails: malformed input degrades to empty fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::IpAddr;

/// Normalized and parsed facts about one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlInfo {
    pub original_url: String,
    pub normalized_url: String,

    pub scheme: String,
    pub host: String,
    /// Last two host labels. Not public-suffix aware.
    pub domain: String,
    pub tld: String,
    pub path: String,
    pub query: String,

    pub is_ip: bool,
    pub is_punycode: bool,
}

impl UrlInfo {
    pub fn uses_https(&self) -> bool {
        self.scheme == "https"
    }

    pub fn host_labels(&self) -> Vec<&str> {
        if self.host.is_empty() {
            return Vec::new();
        }
        self.host.split('.').collect()
    }
}

static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// True when the string already carries a scheme. `host:8080` is a port, not a scheme.
fn has_scheme(s: &str) -> bool {
    match SCHEME_PREFIX.find(s) {
        Some(m) => !s[m.end()..].starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

/// Inject `http://` when no scheme is present, lowercase scheme and authority.
/// Path, query and fragment keep their case.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let Some(colon) = with_scheme.find(':') else {
        return with_scheme;
    };
    let scheme = with_scheme[..colon].to_ascii_lowercase();
    let rest = &with_scheme[colon + 1..];

    match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            let authority = after[..end].to_lowercase();
            format!("{scheme}://{authority}{}", &after[end..])
        }
        None => format!("{scheme}:{rest}"),
    }
}

/// Normalize and parse a URL into its structural facts.
pub fn parse_url(raw: &str) -> UrlInfo {
    let normalized = normalize_url(raw);
    let scheme = normalized
        .split_once(':')
        .map(|(s, _)| s.to_string())
        .unwrap_or_default();

    let (host, path, query) = match url::Url::parse(&normalized) {
        Ok(parsed) => (
            host_of(&parsed),
            parsed.path().to_string(),
            parsed.query().unwrap_or("").to_string(),
        ),
        Err(_) => split_manually(&normalized),
    };

    let is_ip = host.parse::<IpAddr>().is_ok();
    let is_punycode = host.contains("xn--") || !host.is_ascii();
    let (domain, tld) = split_domain_tld(&host, is_ip);

    UrlInfo {
        original_url: raw.to_string(),
        normalized_url: normalized,
        scheme,
        host,
        domain,
        tld,
        path,
        query,
        is_ip,
        is_punycode,
    }
}

/// Lowercased host of a URL string, or empty when there is none.
pub fn host_of_str(raw: &str) -> String {
    parse_url(raw).host
}

fn host_of(parsed: &url::Url) -> String {
    match parsed.host() {
        Some(url::Host::Domain(d)) => d.to_lowercase(),
        Some(url::Host::Ipv4(ip)) => ip.to_string(),
        Some(url::Host::Ipv6(ip)) => ip.to_string(),
        None => String::new(),
    }
}

/// Fallback for strings the `url` crate rejects (bad ports, invalid IPv4 octets...).
fn split_manually(normalized: &str) -> (String, String, String) {
    let Some((_, after)) = normalized.split_once("://") else {
        return Default::default();
    };
    let end = after.find(['/', '?', '#']).unwrap_or(after.len());
    let authority = &after[..end];
    let host_port = authority
        .rsplit_once('@')
        .map(|(_, h)| h)
        .unwrap_or(authority);
    let host = match host_port.strip_prefix('[') {
        Some(v6) => v6.split(']').next().unwrap_or(""),
        None => host_port.split(':').next().unwrap_or(""),
    };

    let rest = &after[end..];
    let without_fragment = rest.split('#').next().unwrap_or("");
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    (host.to_lowercase(), path.to_string(), query.to_string())
}

/// Naive (domain, tld) split on the last two labels.
fn split_domain_tld(host: &str, is_ip: bool) -> (String, String) {
    if host.is_empty() {
        return (String::new(), String::new());
    }
    if is_ip {
        return (host.to_string(), String::new());
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return (host.to_string(), String::new());
    }
    let tld = labels[labels.len() - 1];
    let domain = labels[labels.len() - 2..].join(".");
    (domain, tld.to_string())
}
