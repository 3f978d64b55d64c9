//! Runtime "treadmill" observations: cross-origin requests a page made right
//! after the user touched or submitted a credential form.

use serde::{Deserialize, Serialize};

use crate::verdict::{Severity, SignalFinding, SignalId};

/// Trigger value the client sends when the window opened on form submission.
pub const FORM_SUBMIT: &str = "form_submit";

const PRE_SUBMIT_EXPLANATION: &str = "Unexpected cross-origin network activity occurred shortly after you interacted with a credential field.";
const SUBMIT_WINDOW_EXPLANATION: &str =
    "During credential submission, the page sent data to an unexpected external origin.";

fn default_method() -> String {
    "POST".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreadmillEvent {
    pub origin: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Milliseconds between the trigger and this request.
    #[serde(default)]
    pub elapsed_ms: f64,
    #[serde(default)]
    pub is_new_origin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreadmillObservation {
    pub expected_origin: String,
    /// `form_submit`, or whatever opened the window on the client (e.g. `credential_focus`).
    pub trigger: String,
    #[serde(default)]
    pub window_ms: u64,
    #[serde(default)]
    pub observed_events: Vec<TreadmillEvent>,
}

impl TreadmillObservation {
    pub fn is_submit_window(&self) -> bool {
        self.trigger == FORM_SUBMIT
    }
}

/// One signal per observation with events; `None` when nothing was observed.
pub fn build_signal(obs: &TreadmillObservation) -> Option<SignalFinding> {
    if obs.observed_events.is_empty() {
        return None;
    }

    let (id, severity, explanation) = if obs.is_submit_window() {
        (
            SignalId::TreadmillSubmitWindowCrossOriginPost,
            Severity::Medium,
            SUBMIT_WINDOW_EXPLANATION,
        )
    } else {
        (
            SignalId::TreadmillPreSubmitCrossOriginPost,
            Severity::Low,
            PRE_SUBMIT_EXPLANATION,
        )
    };

    let mut origins: Vec<String> = Vec::new();
    for event in &obs.observed_events {
        if !origins.contains(&event.origin) {
            origins.push(event.origin.clone());
        }
    }
    let methods: Vec<String> = obs.observed_events.iter().map(|e| e.method.clone()).collect();
    let min_elapsed = obs
        .observed_events
        .iter()
        .map(|e| e.elapsed_ms)
        .fold(f64::INFINITY, f64::min);
    let any_new_origin = obs.observed_events.iter().any(|e| e.is_new_origin);

    Some(
        SignalFinding::new(id, severity, explanation)
            .with_evidence("expected_origin", obs.expected_origin.clone())
            .with_evidence("trigger", obs.trigger.clone())
            .with_evidence("window_ms", obs.window_ms)
            .with_evidence("observed_origins", origins)
            .with_evidence("methods", methods)
            .with_evidence("event_count", obs.observed_events.len())
            .with_evidence("min_timing_ms_since_trigger", min_elapsed)
            .with_evidence("is_new_origin", any_new_origin),
    )
}
