use super::{HeuristicReport, Indicator};
use crate::data;
use crate::url_info::UrlInfo;

const LONG_QUERY_CHARS: usize = 200;

/// Run all path- and query-based heuristics.
pub fn check(info: &UrlInfo, report: &mut HeuristicReport) {
    check_credential_keywords(info, report);
    check_urgency_keywords(info, report);
    check_long_query(info, report);
    check_sensitive_query_params(info, report);
}

/// First matching keyword only.
fn check_credential_keywords(info: &UrlInfo, report: &mut HeuristicReport) {
    let path = info.path.to_lowercase();
    if data::credential_keywords().iter().any(|kw| path.contains(kw)) {
        report.flag(
            Indicator::CredentialKeywords,
            20,
            "Path contains login/account-related keywords common in credential harvesting.",
        );
    }
}

fn check_urgency_keywords(info: &UrlInfo, report: &mut HeuristicReport) {
    let haystack = format!("{} {}", info.path, info.query).to_lowercase();
    if data::urgency_keywords().iter().any(|kw| haystack.contains(kw)) {
        report.flag(
            Indicator::UrgencyKeywords,
            10,
            "URL contains urgency wording often used to pressure victims.",
        );
    }
}

fn check_long_query(info: &UrlInfo, report: &mut HeuristicReport) {
    if info.query.chars().count() > LONG_QUERY_CHARS {
        report.flag(
            Indicator::LongQuery,
            5,
            "Query string is unusually long and may carry tracking or encoded payload data.",
        );
    }
}

fn check_sensitive_query_params(info: &UrlInfo, report: &mut HeuristicReport) {
    if info.query.is_empty() {
        return;
    }
    let hit = url::form_urlencoded::parse(info.query.as_bytes())
        .find(|(name, _)| data::is_sensitive_query_param(name.trim()));

    if let Some((name, _)) = hit {
        report.flag(
            Indicator::SensitiveQueryParams,
            20,
            format!("Query parameter '{name}' looks like it carries a secret."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_info::parse_url;

    fn run(url: &str) -> HeuristicReport {
        let mut report = HeuristicReport::default();
        check(&parse_url(url), &mut report);
        report
    }

    #[test]
    fn test_credential_keyword_fires_once() {
        let report = run("https://example.com/account/login/verify-password");
        assert!(report.indicators.is_set(Indicator::CredentialKeywords));
        assert_eq!(report.score, 20);
        assert_eq!(report.explanations.len(), 1);
    }

    #[test]
    fn test_credential_keyword_is_case_insensitive_and_path_only() {
        assert!(run("https://example.com/SignIn").indicators.is_set(Indicator::CredentialKeywords));
        assert!(!run("https://login.example.com/").indicators.is_set(Indicator::CredentialKeywords));
        assert!(!run("https://example.com/?next=login").indicators.is_set(Indicator::CredentialKeywords));
    }

    #[test]
    fn test_urgency_keywords() {
        let report = run("https://example.com/notice?status=account-suspended");
        assert!(report.indicators.is_set(Indicator::UrgencyKeywords));
        assert!(!run("https://example.com/blog").indicators.is_set(Indicator::UrgencyKeywords));
    }

    #[test]
    fn test_long_query_threshold() {
        let at = format!("https://example.com/p?d={}", "a".repeat(198));
        assert!(!run(&at).indicators.is_set(Indicator::LongQuery));
        let over = format!("https://example.com/p?d={}", "a".repeat(199));
        assert!(run(&over).indicators.is_set(Indicator::LongQuery));
    }

    #[test]
    fn test_sensitive_query_params() {
        let report = run("https://example.com/p?user=bob&Password=hunter2");
        assert!(report.indicators.is_set(Indicator::SensitiveQueryParams));
        assert!(!run("https://example.com/p?pinned=1").indicators.is_set(Indicator::SensitiveQueryParams));
    }
}
