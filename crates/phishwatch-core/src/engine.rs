use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::resolver::{ResolveResult, Resolver, Transport};
use crate::rules::{self, Indicator};
use crate::scoring;
use crate::signals::{self, ClientSignal};
use crate::treadmill::{self, TreadmillObservation};
use crate::url_info;
use crate::verdict::{ExternalReputation, ScanResult};

/// Number of findings surfaced as `top_signals`.
pub const TOP_SIGNALS: usize = 3;

/// One check request, as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    #[serde(alias = "url")]
    pub input_url: String,
    /// Redirects the browser observed while loading the page.
    #[serde(default)]
    pub redirect_count: Option<u32>,
    #[serde(default)]
    pub client_signals: Vec<ClientSignal>,
    #[serde(default)]
    pub treadmill: Option<TreadmillObservation>,
    /// Caller vouches for the link as marketing traffic. The allowlist facts on
    /// the resolve result are reported but never downgrade on their own.
    #[serde(default)]
    pub is_marketing_infra: bool,
}

impl CheckRequest {
    pub fn new(input_url: impl Into<String>) -> Self {
        Self {
            input_url: input_url.into(),
            ..Self::default()
        }
    }
}

/// Resolve the URL, then assess it.
pub async fn check<T: Transport>(req: &CheckRequest, resolver: &Resolver<T>) -> ScanResult {
    let start = Instant::now();
    let resolved = resolver.resolve(&req.input_url).await;
    let result = assess(req, &resolved);
    tracing::debug!(
        url = %req.input_url,
        band = %result.risk_band,
        score = result.risk_score,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "check complete"
    );
    result
}

/// Everything after resolution. Pure and deterministic.
pub fn assess(req: &CheckRequest, resolved: &ResolveResult) -> ScanResult {
    let final_url = resolved.final_url.as_str();
    let info = url_info::parse_url(final_url);

    let mut report = rules::analyze(&info);
    if resolved.input_is_shortener {
        report.indicators.set(Indicator::UrlShortener);
    }
    tracing::debug!(
        advisory_score = report.score,
        explanations = ?report.explanations,
        "heuristics"
    );

    let mut signals = signals::indicators_to_signals(&report.indicators);
    if let Some(error) = &resolved.error {
        signals.push(signals::resolution_failed(error));
    }
    signals.extend(signals::runtime_redirects(req.redirect_count.unwrap_or(0)));
    signals.extend(signals::chain_redirects(&resolved.redirect_chain));
    if let Some(obs) = &req.treadmill {
        signals.extend(treadmill::build_signal(obs));
    }
    signals::enforce_insecure_http(final_url, &mut signals);
    signals.extend(signals::accept_client_signals(&req.client_signals));

    let mut signals = signals::dedup_by_id(signals);
    signals::sort_by_severity(&mut signals);

    let risk_score = scoring::score_from_signals(&signals);
    let verdict = scoring::verdict_from_score(risk_score);

    let banding = scoring::band_signals(&signals, req.is_marketing_infra);

    ScanResult {
        input_url: req.input_url.clone(),
        final_url: final_url.to_string(),
        redirect_chain: resolved.redirect_chain.clone(),
        domain: info.host.clone(),
        uses_https: final_url.starts_with("https://"),
        has_punycode: info.is_punycode,
        uses_url_shortener: resolved.input_is_shortener
            || report.indicators.is_set(Indicator::UrlShortener),
        input_is_marketing: resolved.input_is_marketing,
        final_is_marketing: resolved.final_is_marketing,
        domain_age_days: None,
        registrar_country: None,
        hosting_country: None,
        brand_similarity_match: report.brand_match,
        external_reputation: ExternalReputation::disabled(),
        risk_score,
        verdict,
        risk_band: banding.band,
        summary: banding.summary,
        top_signals: signals.iter().take(TOP_SIGNALS).cloned().collect(),
        user_action: scoring::user_action_from_band(banding.band),
        signals,
        treadmill_escalated: banding.escalated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::MarketingAllowlist;
    use crate::resolver::tests::MockTransport;
    use crate::resolver::{ResolveError, ResolverConfig};
    use crate::signals::{ESCALATION_SUMMARY, MARKETING_SUMMARY};
    use crate::treadmill::{TreadmillEvent, FORM_SUBMIT};
    use crate::verdict::{RiskBand, Severity, SignalId, UserAction, Verdict};
    use std::sync::Arc;

    fn resolved(input: &str, chain: &[&str]) -> ResolveResult {
        let chain: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
        let last = chain.last().cloned().unwrap_or_else(|| input.to_string());
        ResolveResult {
            input_url: input.to_string(),
            normalized_input_url: input.to_string(),
            final_url: last.clone(),
            normalized_final_url: last,
            redirect_chain: chain,
            resolved: true,
            input_is_shortener: crate::data::is_url_shortener(&url_info::host_of_str(input)),
            input_is_marketing: false,
            final_is_marketing: false,
            error: None,
        }
    }

    fn ids(result: &ScanResult) -> Vec<SignalId> {
        result.signals.iter().map(|s| s.id).collect()
    }

    fn submit_observation() -> TreadmillObservation {
        TreadmillObservation {
            expected_origin: "https://portal.example.com".into(),
            trigger: FORM_SUBMIT.into(),
            window_ms: 2000,
            observed_events: vec![TreadmillEvent {
                origin: "https://relay.example.net".into(),
                method: "POST".into(),
                elapsed_ms: 85.0,
                is_new_origin: true,
            }],
        }
    }

    #[test]
    fn test_clean_https_page_is_low() {
        let req = CheckRequest::new("https://www.example.com/about");
        let result = assess(&req, &resolved(&req.input_url, &["https://www.example.com/about"]));
        assert!(result.signals.is_empty());
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.verdict, Verdict::Safe);
        assert_eq!(result.risk_band, RiskBand::Low);
        assert_eq!(result.user_action, UserAction::Proceed);
        assert_eq!(result.summary, "No notable risk indicators detected.");
        assert_eq!(result.domain, "www.example.com");
        assert!(result.uses_https);
    }

    #[test]
    fn test_multi_redirect_needs_three_hops() {
        let req = CheckRequest::new("https://a.example.com/");
        let two = assess(&req, &resolved(&req.input_url, &["https://a.example.com/", "https://b.example.com/"]));
        assert!(!ids(&two).contains(&SignalId::MultiRedirect));

        let three = assess(
            &req,
            &resolved(
                &req.input_url,
                &["https://a.example.com/", "https://b.example.com/", "https://c.example.com/"],
            ),
        );
        assert!(ids(&three).contains(&SignalId::MultiRedirect));
        assert_eq!(three.risk_band, RiskBand::Medium);
        assert_eq!(three.summary, "Redirects are being used, which can hide the true destination.");
    }

    #[test]
    fn test_treadmill_with_credential_keywords_escalates() {
        let mut req = CheckRequest::new("https://portal.example.com/login");
        req.treadmill = Some(submit_observation());
        let result = assess(&req, &resolved(&req.input_url, &["https://portal.example.com/login"]));

        assert!(result.treadmill_escalated);
        assert_eq!(result.risk_band, RiskBand::High);
        assert_eq!(result.summary, ESCALATION_SUMMARY);
        assert_eq!(result.user_action, UserAction::Avoid);
    }

    #[test]
    fn test_treadmill_with_form_action_signal_escalates_without_high() {
        let mut req = CheckRequest::new("https://portal.example.com/");
        req.treadmill = Some(submit_observation());
        req.client_signals = vec![ClientSignal {
            id: "credential_form_action_cross_origin".into(),
            severity: Severity::Medium,
            explanation: "The login form submits to a different site.".into(),
            evidence: Default::default(),
        }];
        let result = assess(&req, &resolved(&req.input_url, &["https://portal.example.com/"]));
        assert!(result.treadmill_escalated);
        assert_eq!(result.risk_band, RiskBand::High);
        // No high severity evidence, so the score stays in the medium range.
        assert!(result.risk_score <= 59);
    }

    #[test]
    fn test_marketing_downgrade_is_explicit() {
        let chain = ["https://bit.ly/promo", "https://t.example.net/c", "https://shop.example.com/sale"];
        let mut req = CheckRequest::new("https://bit.ly/promo");

        req.is_marketing_infra = true;
        let result = assess(&req, &resolved(&req.input_url, &chain));
        assert!(ids(&result).contains(&SignalId::UrlShortener));
        assert!(ids(&result).contains(&SignalId::MultiRedirect));
        assert_eq!(result.risk_band, RiskBand::Low);
        assert_eq!(result.summary, MARKETING_SUMMARY);

        req.is_marketing_infra = false;
        let result = assess(&req, &resolved(&req.input_url, &chain));
        assert_eq!(result.risk_band, RiskBand::Medium);
        assert!(result.uses_url_shortener);
    }

    #[test]
    fn test_allowlist_match_alone_does_not_downgrade() {
        // First-label patterns like `click.` are attacker-controllable.
        let chain = ["https://click.attacker-site.com/x", "https://a.example.net/", "https://shop.example.com/"];
        let req = CheckRequest::new(chain[0]);
        let mut res = resolved(&req.input_url, &chain);
        res.input_is_marketing = true;
        res.final_is_marketing = true;

        let result = assess(&req, &res);
        assert_eq!(result.risk_band, RiskBand::Medium);
        assert_ne!(result.summary, MARKETING_SUMMARY);
        assert!(result.input_is_marketing);
        assert!(result.final_is_marketing);

        let mut req = req;
        req.is_marketing_infra = true;
        assert_eq!(assess(&req, &res).risk_band, RiskBand::Low);
    }

    #[test]
    fn test_resolution_failure_degrades_to_input() {
        let req = CheckRequest::new("http://127.0.0.1/login");
        let res = ResolveResult::failed(&req.input_url, &MarketingAllowlist::empty(), ResolveError::BlockedHost);
        let result = assess(&req, &res);

        let ids = ids(&result);
        assert!(ids.contains(&SignalId::ResolutionFailed));
        assert!(ids.contains(&SignalId::IpInUrl));
        assert!(ids.contains(&SignalId::CredentialKeywords));
        assert!(ids.contains(&SignalId::InsecureHttp));
        assert_eq!(result.final_url, "http://127.0.0.1/login");
        assert_eq!(result.risk_band, RiskBand::High);
        assert!(!result.uses_https);

        let failed = result
            .signals
            .iter()
            .find(|s| s.id == SignalId::ResolutionFailed)
            .unwrap();
        assert_eq!(
            failed.evidence["error"],
            "blocked_host: destination is not publicly routable"
        );
    }

    #[test]
    fn test_runtime_redirects_and_top_signals() {
        let mut req = CheckRequest::new("http://a.b.c.example.xyz/verify");
        req.redirect_count = Some(2);
        let result = assess(&req, &resolved(&req.input_url, &["http://a.b.c.example.xyz/verify"]));
        assert!(ids(&result).contains(&SignalId::RuntimeMultiRedirect));
        assert_eq!(result.top_signals.len(), TOP_SIGNALS);
        assert_eq!(result.top_signals[0].id, SignalId::CredentialKeywords);
        assert_eq!(result.top_signals, result.signals[..TOP_SIGNALS].to_vec());
        // Severity ordering holds across the whole list.
        assert!(result
            .signals
            .windows(2)
            .all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn test_client_signals_merged_and_unknown_dropped() {
        let mut req = CheckRequest::new("https://www.example.com/");
        req.client_signals = vec![
            ClientSignal {
                id: "unexpected_cross_origin_post_during_auth".into(),
                severity: Severity::Medium,
                explanation: "A background request went to another site during sign-in.".into(),
                evidence: Default::default(),
            },
            ClientSignal {
                id: "totally_unknown".into(),
                severity: Severity::High,
                explanation: String::new(),
                evidence: Default::default(),
            },
        ];
        let result = assess(&req, &resolved(&req.input_url, &["https://www.example.com/"]));
        assert_eq!(ids(&result), vec![SignalId::UnexpectedCrossOriginPostDuringAuth]);
        assert_eq!(result.risk_band, RiskBand::Medium);
    }

    #[test]
    fn test_brand_match_reported() {
        let req = CheckRequest::new("https://paypal.com.secure-check.example/");
        let result = assess(&req, &resolved(&req.input_url, &["https://paypal.com.secure-check.example/"]));
        assert_eq!(result.brand_similarity_match.as_deref(), Some("paypal.com"));
        assert_eq!(result.summary, "The destination may be impersonating a trusted brand.");
    }

    #[test]
    fn test_result_shape_has_every_field() {
        let req = CheckRequest::new("https://www.example.com/");
        let result = assess(&req, &resolved(&req.input_url, &["https://www.example.com/"]));
        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "input_url",
            "final_url",
            "redirect_chain",
            "domain",
            "uses_https",
            "has_punycode",
            "uses_url_shortener",
            "domain_age_days",
            "registrar_country",
            "hosting_country",
            "brand_similarity_match",
            "external_reputation",
            "risk_score",
            "verdict",
            "risk_band",
            "summary",
            "top_signals",
            "user_action",
            "signals",
            "treadmill_escalated",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["domain_age_days"].is_null());
        assert_eq!(json["external_reputation"]["gsb"]["checked"], false);
        assert_eq!(json["external_reputation"]["virustotal"]["reason"], "disabled_in_v1");
        assert_eq!(json["verdict"], "SAFE");
    }

    #[test]
    fn test_request_accepts_url_alias() {
        let req: CheckRequest = serde_json::from_str(r#"{"url": "example.com"}"#).unwrap();
        assert_eq!(req.input_url, "example.com");
        assert!(req.client_signals.is_empty());
        assert!(req.treadmill.is_none());
        assert!(!req.is_marketing_infra);
    }

    #[tokio::test]
    async fn test_pipeline_is_deterministic_under_mock_network() {
        let transport = MockTransport::new()
            .host("bit.ly", "67.199.248.10")
            .host("hop.example.net", "93.184.216.34")
            .host("login.example.xyz", "93.184.216.35")
            .redirect("https://bit.ly/x", "https://hop.example.net/r")
            .redirect("https://hop.example.net/r", "https://login.example.xyz/signin")
            .ok("https://login.example.xyz/signin");
        let resolver = Resolver::with_transport(
            transport,
            Arc::new(MarketingAllowlist::empty()),
            ResolverConfig::default(),
        );
        let req = CheckRequest::new("https://bit.ly/x");

        let first = check(&req, &resolver).await;
        let second = check(&req, &resolver).await;
        assert_eq!(first, second);
        assert_eq!(first.final_url, "https://login.example.xyz/signin");
        assert_eq!(first.redirect_chain.len(), 3);
        assert!(first.uses_url_shortener);
        assert_eq!(first.risk_band, RiskBand::High);
        assert_eq!(first.verdict, Verdict::Malicious);
    }
}
