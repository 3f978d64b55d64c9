//! Heuristic battery over parsed URL facts.
//!
//! Every check runs unconditionally and independently. The point values are
//! advisory: final scoring is driven by signal weights, not by these.

pub mod hostname;
pub mod path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::url_info::UrlInfo;

/// Closed vocabulary of heuristic indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    UrlShortener,
    Punycode,
    SuspiciousTld,
    IpAddressUrl,
    ManySubdomains,
    CredentialKeywords,
    BrandLookalike,
    MismatchedBrand,
    UrgencyKeywords,
    LongQuery,
    SensitiveQueryParams,
}

impl Indicator {
    pub const ALL: [Indicator; 11] = [
        Indicator::UrlShortener,
        Indicator::Punycode,
        Indicator::SuspiciousTld,
        Indicator::IpAddressUrl,
        Indicator::ManySubdomains,
        Indicator::CredentialKeywords,
        Indicator::BrandLookalike,
        Indicator::MismatchedBrand,
        Indicator::UrgencyKeywords,
        Indicator::LongQuery,
        Indicator::SensitiveQueryParams,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Indicator::UrlShortener => "url_shortener",
            Indicator::Punycode => "punycode",
            Indicator::SuspiciousTld => "suspicious_tld",
            Indicator::IpAddressUrl => "ip_address_url",
            Indicator::ManySubdomains => "many_subdomains",
            Indicator::CredentialKeywords => "credential_keywords",
            Indicator::BrandLookalike => "brand_lookalike",
            Indicator::MismatchedBrand => "mismatched_brand",
            Indicator::UrgencyKeywords => "urgency_keywords",
            Indicator::LongQuery => "long_query",
            Indicator::SensitiveQueryParams => "sensitive_query_params",
        }
    }
}

/// Active indicators. Serializes as a complete `name -> bool` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSet(BTreeSet<Indicator>);

impl IndicatorSet {
    pub fn set(&mut self, indicator: Indicator) {
        self.0.insert(indicator);
    }

    pub fn is_set(&self, indicator: Indicator) -> bool {
        self.0.contains(&indicator)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Active indicators in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = Indicator> + '_ {
        self.0.iter().copied()
    }
}

impl Serialize for IndicatorSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Indicator::ALL.len()))?;
        for indicator in Indicator::ALL {
            map.serialize_entry(indicator.as_str(), &self.is_set(indicator))?;
        }
        map.end()
    }
}

pub const NOTHING_DETECTED: &str =
    "No suspicious URL patterns or known phishing indicators were detected.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct HeuristicReport {
    pub score: u32,
    pub explanations: Vec<String>,
    pub indicators: IndicatorSet,
    /// Official domain of the brand an impersonation check matched.
    pub brand_match: Option<String>,
}

impl HeuristicReport {
    pub(crate) fn flag(&mut self, indicator: Indicator, points: u32, explanation: impl Into<String>) {
        self.indicators.set(indicator);
        self.score += points;
        self.explanations.push(explanation.into());
    }
}

/// Run every heuristic against a parsed URL.
pub fn analyze(info: &UrlInfo) -> HeuristicReport {
    let mut report = HeuristicReport::default();

    hostname::check(info, &mut report);
    path::check(info, &mut report);

    if report.explanations.is_empty() {
        report.explanations.push(NOTHING_DETECTED.to_string());
    }
    report
}
