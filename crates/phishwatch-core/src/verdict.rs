use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier for every signal the engine can emit or accept from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    // Domain deception
    PunycodeIdn,
    BrandLookalike,
    MismatchedBrand,

    // Destination hiding
    UrlShortener,
    MultiRedirect,
    RuntimeMultiRedirect,

    // Infrastructure
    IpInUrl,
    SuspiciousTld,
    ManySubdomains,

    // Content and intent
    CredentialKeywords,
    UrgencyKeywords,

    // Tracking and transport
    LongQuery,
    SensitiveParams,
    InsecureHttp,
    ResolutionFailed,

    // Runtime treadmill
    TreadmillPreSubmitCrossOriginPost,
    TreadmillSubmitWindowCrossOriginPost,

    // Client-side page inspection
    CredentialFormActionCrossOrigin,
    UnexpectedCrossOriginPostDuringAuth,
}

impl SignalId {
    /// Signals that refine a verdict but never justify an elevated band on their own.
    pub fn is_modifier_only(self) -> bool {
        matches!(
            self,
            SignalId::TreadmillPreSubmitCrossOriginPost
                | SignalId::LongQuery
                | SignalId::InsecureHttp
        )
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{self:?}"));
        write!(f, "{s}")
    }
}

impl FromStr for SignalId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown signal id: {s}"))
    }
}

/// Severity level for signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Free-form supporting data for a signal. Ordered so output is stable.
pub type Evidence = BTreeMap<String, serde_json::Value>;

/// A single piece of explained evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFinding {
    pub id: SignalId,
    pub severity: Severity,
    pub explanation: String,
    #[serde(default)]
    pub evidence: Evidence,
}

impl SignalFinding {
    pub fn new(id: SignalId, severity: Severity, explanation: impl Into<String>) -> Self {
        Self {
            id,
            severity,
            explanation: explanation.into(),
            evidence: Evidence::new(),
        }
    }

    pub fn with_evidence(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }
}

/// Internal classification derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Malicious,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe => write!(f, "SAFE"),
            Verdict::Suspicious => write!(f, "SUSPICIOUS"),
            Verdict::Malicious => write!(f, "MALICIOUS"),
        }
    }
}

/// Coarse classification shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Process exit code: allow / block / warn, matching the CLI convention.
    pub fn exit_code(self) -> i32 {
        match self {
            RiskBand::Low => 0,
            RiskBand::High => 1,
            RiskBand::Medium => 2,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::Low => write!(f, "low"),
            RiskBand::Medium => write!(f, "medium"),
            RiskBand::High => write!(f, "high"),
        }
    }
}

/// What the user should do with the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Proceed,
    Review,
    Avoid,
}

/// Result of one external reputation source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalInfo {
    pub checked: bool,
    pub status: Option<String>,
    pub reason: Option<String>,
}

impl ExternalInfo {
    pub fn disabled() -> Self {
        Self {
            checked: false,
            status: None,
            reason: Some("disabled_in_v1".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalReputation {
    pub gsb: ExternalInfo,
    pub virustotal: ExternalInfo,
}

impl ExternalReputation {
    pub fn disabled() -> Self {
        Self {
            gsb: ExternalInfo::disabled(),
            virustotal: ExternalInfo::disabled(),
        }
    }
}

/// Complete result of a check. Every field is always present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub input_url: String,
    pub final_url: String,
    pub redirect_chain: Vec<String>,

    pub domain: String,
    pub uses_https: bool,
    pub has_punycode: bool,
    pub uses_url_shortener: bool,
    pub input_is_marketing: bool,
    pub final_is_marketing: bool,

    pub domain_age_days: Option<u32>,
    pub registrar_country: Option<String>,
    pub hosting_country: Option<String>,
    pub brand_similarity_match: Option<String>,

    pub external_reputation: ExternalReputation,

    pub risk_score: u32,
    pub verdict: Verdict,
    pub risk_band: RiskBand,
    pub summary: String,
    pub top_signals: Vec<SignalFinding>,
    pub user_action: UserAction,
    pub signals: Vec<SignalFinding>,
    pub treadmill_escalated: bool,
}
