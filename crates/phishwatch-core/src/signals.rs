//! Signal synthesis: indicators and pipeline facts become explained findings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::resolver::ResolveError;
use crate::rules::{Indicator, IndicatorSet};
use crate::verdict::{Evidence, Severity, SignalFinding, SignalId};

pub const NEUTRAL_SUMMARY: &str = "No notable risk indicators detected.";
pub const ESCALATION_SUMMARY: &str = "Credential submission was followed by unexpected external data transfer, consistent with a credential relay flow.";
pub const MARKETING_SUMMARY: &str =
    "This link uses marketing/tracking infrastructure with expected redirect behavior.";

const INSECURE_HTTP_EXPLANATION: &str =
    "This page uses an unencrypted HTTP connection, which can be intercepted on insecure networks.";

/// Indicator to (signal id, severity, explanation).
pub fn indicator_signal(indicator: Indicator) -> (SignalId, Severity, &'static str) {
    match indicator {
        Indicator::Punycode => (
            SignalId::PunycodeIdn,
            Severity::Medium,
            "The domain uses punycode (IDN), which can hide lookalike characters (e.g., 'paypaI' vs 'paypal').",
        ),
        Indicator::BrandLookalike => (
            SignalId::BrandLookalike,
            Severity::High,
            "The domain looks similar to a known brand (possible impersonation).",
        ),
        Indicator::MismatchedBrand => (
            SignalId::MismatchedBrand,
            Severity::High,
            "The link mentions a brand, but the actual domain doesn't match that brand's official domain.",
        ),
        Indicator::UrlShortener => (
            SignalId::UrlShortener,
            Severity::Medium,
            "This link uses a URL shortener, which hides the real destination until you open it.",
        ),
        Indicator::IpAddressUrl => (
            SignalId::IpInUrl,
            Severity::High,
            "This link uses a raw IP address instead of a normal domain name, which is common in phishing and malware delivery.",
        ),
        Indicator::SuspiciousTld => (
            SignalId::SuspiciousTld,
            Severity::Medium,
            "The domain ends in a TLD that is frequently abused in phishing/spam campaigns.",
        ),
        Indicator::ManySubdomains => (
            SignalId::ManySubdomains,
            Severity::Medium,
            "The domain has many subdomains, which is often used to make a link look more trustworthy than it is.",
        ),
        Indicator::CredentialKeywords => (
            SignalId::CredentialKeywords,
            Severity::High,
            "This URL contains login/account keywords, which are commonly used on credential-harvesting pages.",
        ),
        Indicator::UrgencyKeywords => (
            SignalId::UrgencyKeywords,
            Severity::Medium,
            "This link uses urgency language (e.g., 'urgent', 'verify now'), a common phishing tactic.",
        ),
        Indicator::LongQuery => (
            SignalId::LongQuery,
            Severity::Low,
            "This URL has an unusually long query string, which can be used to hide tracking or payload data.",
        ),
        Indicator::SensitiveQueryParams => (
            SignalId::SensitiveParams,
            Severity::High,
            "This URL contains parameters that resemble sensitive data (tokens, emails, passwords).",
        ),
    }
}

/// One finding per active indicator, in vocabulary order.
pub fn indicators_to_signals(indicators: &IndicatorSet) -> Vec<SignalFinding> {
    indicators
        .iter()
        .map(|indicator| {
            let (id, severity, explanation) = indicator_signal(indicator);
            SignalFinding::new(id, severity, explanation).with_evidence("indicator", indicator.as_str())
        })
        .collect()
}

pub fn resolution_failed(error: &ResolveError) -> SignalFinding {
    SignalFinding::new(
        SignalId::ResolutionFailed,
        Severity::Low,
        "This link could not be fully resolved (it may be expired or unreachable).",
    )
    .with_evidence("error", error.to_string())
}

/// Redirects the client saw while the page loaded.
pub fn runtime_redirects(redirect_count: u32) -> Option<SignalFinding> {
    (redirect_count >= 1).then(|| {
        SignalFinding::new(
            SignalId::RuntimeMultiRedirect,
            Severity::Medium,
            format!(
                "This page performed {redirect_count} redirect(s) before loading, which can hide the true destination."
            ),
        )
        .with_evidence("redirect_count", redirect_count)
    })
}

/// Redirects the resolver followed: input plus at least two further hops.
pub fn chain_redirects(redirect_chain: &[String]) -> Option<SignalFinding> {
    (redirect_chain.len() >= 3).then(|| {
        SignalFinding::new(
            SignalId::MultiRedirect,
            Severity::Medium,
            "This link uses multiple redirects, which can hide the true destination.",
        )
        .with_evidence("redirect_hops", redirect_chain.len())
    })
}

/// Ensure exactly one `insecure_http` finding when the destination is plain HTTP.
/// An existing instance is replaced in place.
pub fn enforce_insecure_http(final_url: &str, signals: &mut Vec<SignalFinding>) {
    if !final_url.starts_with("http://") {
        return;
    }
    let finding = SignalFinding::new(SignalId::InsecureHttp, Severity::Low, INSECURE_HTTP_EXPLANATION)
        .with_evidence("final_url", final_url);

    match signals.iter_mut().find(|s| s.id == SignalId::InsecureHttp) {
        Some(existing) => *existing = finding,
        None => signals.push(finding),
    }
}

/// Signal reported by the browser-side page inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSignal {
    pub id: String,
    pub severity: Severity,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub evidence: Evidence,
}

/// Convert client signals, dropping ids outside the known vocabulary.
pub fn accept_client_signals(client: &[ClientSignal]) -> Vec<SignalFinding> {
    client
        .iter()
        .filter_map(|c| match c.id.parse::<SignalId>() {
            Ok(id) => Some(SignalFinding {
                id,
                severity: c.severity,
                explanation: c.explanation.clone(),
                evidence: c.evidence.clone(),
            }),
            Err(e) => {
                tracing::warn!("dropping client signal: {e}");
                None
            }
        })
        .collect()
}

/// Keep the first finding for each id.
pub fn dedup_by_id(signals: Vec<SignalFinding>) -> Vec<SignalFinding> {
    let mut seen = BTreeSet::new();
    signals.into_iter().filter(|s| seen.insert(s.id)).collect()
}

/// Severity descending; ties keep their relative order.
pub fn sort_by_severity(signals: &mut [SignalFinding]) {
    signals.sort_by(|a, b| b.severity.cmp(&a.severity));
}

fn ids_of(signals: &[SignalFinding]) -> BTreeSet<SignalId> {
    signals.iter().map(|s| s.id).collect()
}

/// Credential relay pattern: a submission-window cross-origin post together
/// with a credential or impersonation signal.
pub fn should_escalate(signals: &[SignalFinding]) -> bool {
    let ids = ids_of(signals);
    ids.contains(&SignalId::TreadmillSubmitWindowCrossOriginPost)
        && (ids.contains(&SignalId::CredentialKeywords)
            || ids.contains(&SignalId::MismatchedBrand)
            || ids.contains(&SignalId::CredentialFormActionCrossOrigin))
}

type IdSet = BTreeSet<SignalId>;

/// Pick the user-facing summary. Order is product priority, not severity.
pub fn summary_from_signals(signals: &[SignalFinding]) -> String {
    if signals.is_empty() {
        return NEUTRAL_SUMMARY.to_string();
    }
    if should_escalate(signals) {
        return ESCALATION_SUMMARY.to_string();
    }

    let ladder: [(fn(&IdSet) -> bool, &str); 11] = [
        (
            |ids| ids.contains(&SignalId::CredentialKeywords),
            "This link looks like it may be trying to capture login credentials.",
        ),
        (
            |ids| ids.contains(&SignalId::MismatchedBrand) || ids.contains(&SignalId::BrandLookalike),
            "The destination may be impersonating a trusted brand.",
        ),
        (
            |ids| ids.contains(&SignalId::TreadmillSubmitWindowCrossOriginPost),
            "During credential submission, the page sent data to an unexpected external origin.",
        ),
        (
            |ids| {
                ids.contains(&SignalId::UrlShortener)
                    && (ids.contains(&SignalId::MultiRedirect)
                        || ids.contains(&SignalId::RuntimeMultiRedirect))
            },
            "The destination is being hidden behind a short link and redirects.",
        ),
        (
            |ids| ids.contains(&SignalId::MultiRedirect) || ids.contains(&SignalId::RuntimeMultiRedirect),
            "Redirects are being used, which can hide the true destination.",
        ),
        (
            |ids| ids.contains(&SignalId::UrlShortener),
            "The destination is hidden behind a shortened link.",
        ),
        (
            |ids| ids.contains(&SignalId::IpInUrl),
            "The destination uses a raw IP address instead of a normal domain.",
        ),
        (
            |ids| ids.contains(&SignalId::PunycodeIdn),
            "The domain uses lookalike characters (IDN/punycode).",
        ),
        (
            |ids| ids.contains(&SignalId::InsecureHttp),
            "This page loads over HTTP (no encryption). Avoid entering sensitive data.",
        ),
        (
            |ids| ids.contains(&SignalId::SensitiveParams),
            "This URL contains parameters that look like sensitive data (tokens/emails/passwords).",
        ),
        (
            |ids| ids.contains(&SignalId::LongQuery),
            "This URL contains a long query string, which can hide tracking or payload data.",
        ),
    ];

    let ids = ids_of(signals);
    if let Some((_, message)) = ladder.iter().find(|(applies, _)| applies(&ids)) {
        return message.to_string();
    }

    // First of the most severe findings, matching the sorted order.
    let top = signals.iter().map(|s| s.severity).max();
    signals
        .iter()
        .find(|s| Some(s.severity) == top)
        .map(|s| s.explanation.clone())
        .unwrap_or_else(|| NEUTRAL_SUMMARY.to_string())
}
