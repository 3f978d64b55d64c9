//! Marketing / tracking infrastructure allowlist.
//!
//! Loaded once at startup and shared read-only. A missing or malformed
//! document degrades to an empty list: every lookup reports "no match".

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// On-disk shape: category name to domains, plus first-label patterns such as `click.`.
#[derive(Debug, Default, Deserialize)]
struct AllowlistDocument {
    #[serde(default)]
    categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    subdomain_patterns: Vec<String>,
}

#[derive(Debug)]
pub enum AllowlistError {
    Io(String),
    Parse(String),
}

impl fmt::Display for AllowlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowlistError::Io(msg) => write!(f, "cannot read allowlist: {msg}"),
            AllowlistError::Parse(msg) => write!(f, "invalid allowlist: {msg}"),
        }
    }
}

impl std::error::Error for AllowlistError {}

/// How a host matched the allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowlistMatch {
    Exact { domain: String, category: String },
    Suffix { domain: String, category: String },
    Pattern { pattern: String },
}

#[derive(Debug, Clone, Default)]
pub struct MarketingAllowlist {
    /// domain -> category
    domains: HashMap<String, String>,
    patterns: Vec<String>,
}

impl MarketingAllowlist {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, AllowlistError> {
        let doc: AllowlistDocument =
            serde_json::from_str(text).map_err(|e| AllowlistError::Parse(e.to_string()))?;

        let mut domains = HashMap::new();
        for (category, entries) in doc.categories {
            for entry in entries {
                let domain = entry.trim().trim_start_matches("*.").to_lowercase();
                if domain.is_empty() {
                    continue;
                }
                domains.entry(domain).or_insert_with(|| category.clone());
            }
        }

        let mut patterns: Vec<String> = doc
            .subdomain_patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty() && p != ".")
            .map(|p| if p.ends_with('.') { p } else { format!("{p}.") })
            .collect();
        patterns.sort();
        patterns.dedup();

        Ok(Self { domains, patterns })
    }

    pub fn load(path: &Path) -> Result<Self, AllowlistError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AllowlistError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Load from `path` if given; any failure is logged and yields an empty allowlist.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };
        match Self::load(path) {
            Ok(list) => {
                tracing::info!(
                    path = %path.display(),
                    domains = list.domain_count(),
                    patterns = list.pattern_count(),
                    "marketing allowlist loaded"
                );
                list
            }
            Err(e) => {
                tracing::warn!("{e}; continuing without marketing allowlist");
                Self::empty()
            }
        }
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.patterns.is_empty()
    }

    pub fn matches(&self, host: &str) -> bool {
        self.lookup(host).is_some()
    }

    /// Exact domain, then any parent domain, then first-label patterns.
    pub fn lookup(&self, host: &str) -> Option<AllowlistMatch> {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return None;
        }

        if let Some(category) = self.domains.get(&host) {
            return Some(AllowlistMatch::Exact {
                domain: host,
                category: category.clone(),
            });
        }

        let mut rest = host.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if let Some(category) = self.domains.get(parent) {
                return Some(AllowlistMatch::Suffix {
                    domain: parent.to_string(),
                    category: category.clone(),
                });
            }
            rest = parent;
        }

        // A pattern only applies to a subdomain of something, never to a bare domain.
        if host.split('.').count() >= 3 {
            if let Some(pattern) = self.patterns.iter().find(|p| host.starts_with(p.as_str())) {
                return Some(AllowlistMatch::Pattern {
                    pattern: pattern.clone(),
                });
            }
        }

        None
    }
}
