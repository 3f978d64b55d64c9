//! Weighted scoring, banding and the overrides applied on top of the band.

use crate::signals::{self, ESCALATION_SUMMARY, MARKETING_SUMMARY, NEUTRAL_SUMMARY};
use crate::verdict::{RiskBand, Severity, SignalFinding, SignalId, UserAction, Verdict};

/// Ranking weight per signal. Weights order results inside a band; they never
/// lift a result above what its severities allow.
pub fn weight(id: SignalId) -> u32 {
    match id {
        SignalId::PunycodeIdn => 25,
        SignalId::UrlShortener => 25,
        SignalId::MultiRedirect => 20,
        SignalId::RuntimeMultiRedirect => 20,

        SignalId::IpInUrl => 60,
        SignalId::BrandLookalike => 60,
        SignalId::MismatchedBrand => 70,
        SignalId::CredentialKeywords => 70,
        SignalId::SensitiveParams => 60,

        SignalId::SuspiciousTld => 20,
        SignalId::ManySubdomains => 20,
        SignalId::UrgencyKeywords => 20,

        SignalId::LongQuery => 10,
        SignalId::InsecureHttp => 5,
        SignalId::ResolutionFailed => 0,

        SignalId::TreadmillPreSubmitCrossOriginPost => 5,
        SignalId::TreadmillSubmitWindowCrossOriginPost => 30,

        SignalId::CredentialFormActionCrossOrigin => 30,
        SignalId::UnexpectedCrossOriginPostDuringAuth => 20,
    }
}

/// Highest severity among signals allowed to drive the band.
pub fn max_effective_severity(signals: &[SignalFinding]) -> Severity {
    signals
        .iter()
        .filter(|s| !s.id.is_modifier_only())
        .map(|s| s.severity)
        .max()
        .unwrap_or(Severity::Low)
}

/// Summed weights clamped to 0..=100, then capped by the strongest evidence.
pub fn score_from_signals(signals: &[SignalFinding]) -> u32 {
    let raw: u32 = signals.iter().map(|s| weight(s.id)).sum();
    let cap = match max_effective_severity(signals) {
        Severity::Low => 19,
        Severity::Medium => 59,
        Severity::High => 100,
    };
    raw.min(100).min(cap)
}

pub fn verdict_from_score(score: u32) -> Verdict {
    if score >= 60 {
        Verdict::Malicious
    } else if score >= 20 {
        Verdict::Suspicious
    } else {
        Verdict::Safe
    }
}

pub fn risk_band_from_signals(signals: &[SignalFinding]) -> RiskBand {
    match max_effective_severity(signals) {
        Severity::High => RiskBand::High,
        Severity::Medium => RiskBand::Medium,
        Severity::Low => RiskBand::Low,
    }
}

/// Demote a band its evidence does not justify; the summary resets to neutral.
pub fn enforce_band_invariant(
    band: RiskBand,
    signals: &[SignalFinding],
    summary: String,
) -> (RiskBand, String) {
    let supported = risk_band_from_signals(signals);
    if band > supported {
        tracing::debug!(%band, %supported, "band not supported by evidence, demoting");
        return (supported, NEUTRAL_SUMMARY.to_string());
    }
    (band, summary)
}

/// Signals that are expected on marketing links and do not warrant a warning there.
fn is_marketing_benign(id: SignalId) -> bool {
    matches!(
        id,
        SignalId::UrlShortener | SignalId::MultiRedirect | SignalId::RuntimeMultiRedirect
    )
}

/// True when every medium/high non-modifier signal is one marketing links
/// routinely produce. Credential and impersonation signals always block this.
pub fn marketing_downgrade_applies(signals: &[SignalFinding]) -> bool {
    signals
        .iter()
        .filter(|s| !s.id.is_modifier_only() && s.severity >= Severity::Medium)
        .all(|s| is_marketing_benign(s.id))
}

pub fn user_action_from_band(band: RiskBand) -> UserAction {
    match band {
        RiskBand::High => UserAction::Avoid,
        RiskBand::Medium => UserAction::Review,
        RiskBand::Low => UserAction::Proceed,
    }
}

/// Band, summary and escalation flag for a finished signal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banding {
    pub band: RiskBand,
    pub summary: String,
    pub escalated: bool,
}

/// Summary ladder, then band, invariant, escalation override and marketing downgrade, in that order.
pub fn band_signals(signals: &[SignalFinding], is_marketing_infra: bool) -> Banding {
    let summary = signals::summary_from_signals(signals);
    let band = risk_band_from_signals(signals);
    let (mut band, mut summary) = enforce_band_invariant(band, signals, summary);

    let escalated = signals::should_escalate(signals);
    if escalated {
        band = RiskBand::High;
        summary = ESCALATION_SUMMARY.to_string();
    }

    if is_marketing_infra
        && !escalated
        && band == RiskBand::Medium
        && marketing_downgrade_applies(signals)
    {
        tracing::debug!(%band, "marketing infrastructure, downgrading band");
        band = RiskBand::Low;
        summary = MARKETING_SUMMARY.to_string();
    }

    Banding {
        band,
        summary,
        escalated,
    }
}
