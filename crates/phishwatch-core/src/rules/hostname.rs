use super::{HeuristicReport, Indicator};
use crate::data;
use crate::url_info::UrlInfo;
use crate::util::levenshtein;

/// Shortest brand label considered for one-edit lookalikes; shorter labels collide too often.
const MIN_LOOKALIKE_LEN: usize = 5;

/// Run all host-based heuristics.
pub fn check(info: &UrlInfo, report: &mut HeuristicReport) {
    check_suspicious_tld(info, report);
    check_ip_address(info, report);
    check_many_subdomains(info, report);
    check_url_shortener(info, report);
    check_punycode(info, report);

    if !info.is_ip {
        check_brand_lookalike(info, report);
        check_mismatched_brand(info, report);
    }
}

fn check_suspicious_tld(info: &UrlInfo, report: &mut HeuristicReport) {
    if !info.tld.is_empty() && data::is_suspicious_tld(&info.tld) {
        report.flag(
            Indicator::SuspiciousTld,
            20,
            "TLD is commonly seen in phishing or spam campaigns.",
        );
    }
}

fn check_ip_address(info: &UrlInfo, report: &mut HeuristicReport) {
    if info.is_ip {
        report.flag(
            Indicator::IpAddressUrl,
            40,
            "URL uses a raw IP address instead of a domain name.",
        );
    }
}

fn check_many_subdomains(info: &UrlInfo, report: &mut HeuristicReport) {
    // Dotted IPv4 literals count too.
    if info.host_labels().len() >= 4 {
        report.flag(
            Indicator::ManySubdomains,
            10,
            "Domain has many nested subdomains (common obfuscation technique).",
        );
    }
}

fn check_url_shortener(info: &UrlInfo, report: &mut HeuristicReport) {
    if data::is_url_shortener(&info.host) {
        report.flag(
            Indicator::UrlShortener,
            20,
            "URL uses a shortening service, hiding the final destination.",
        );
    }
}

fn check_punycode(info: &UrlInfo, report: &mut HeuristicReport) {
    if info.is_punycode {
        report.flag(
            Indicator::Punycode,
            15,
            "Domain uses punycode which can disguise lookalike characters.",
        );
    }
}

/// Second-level label one substituted character away from a brand, e.g. `paypa1.com`.
/// Insertions and deletions are ignored: they mostly produce unrelated words
/// (`cloud` from `icloud`).
fn check_brand_lookalike(info: &UrlInfo, report: &mut HeuristicReport) {
    let Some(sld) = info.domain.split('.').next().filter(|s| !s.is_empty()) else {
        return;
    };

    let hit = data::brands().iter().find(|brand| {
        brand.label.len() >= MIN_LOOKALIKE_LEN
            && sld.len() == brand.label.len()
            && levenshtein(sld, brand.label) == 1
            && !brand.owns(&info.host)
    });

    if let Some(brand) = hit {
        report.flag(
            Indicator::BrandLookalike,
            25,
            format!(
                "Domain '{}' closely resembles the brand '{}'.",
                info.domain, brand.label
            ),
        );
        report
            .brand_match
            .get_or_insert_with(|| brand.primary_domain().to_string());
    }
}

/// Brand name used as a host token on a domain the brand does not own,
/// e.g. `paypal.com.account-check.xyz`.
fn check_mismatched_brand(info: &UrlInfo, report: &mut HeuristicReport) {
    let tokens: Vec<&str> = info.host.split(['.', '-']).collect();

    let hit = data::brands()
        .iter()
        .find(|brand| tokens.contains(&brand.label) && !brand.owns(&info.host));

    if let Some(brand) = hit {
        report.flag(
            Indicator::MismatchedBrand,
            25,
            format!(
                "Hostname mentions '{}' but is not hosted on {}.",
                brand.label,
                brand.primary_domain()
            ),
        );
        report
            .brand_match
            .get_or_insert_with(|| brand.primary_domain().to_string());
    }
}
