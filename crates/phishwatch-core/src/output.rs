use std::io::Write;

use crate::resolver::ResolveResult;
use crate::util::truncate_chars;
use crate::verdict::{RiskBand, ScanResult, Severity};

/// Longest URL printed in human output before it is shortened.
const MAX_URL_CHARS: usize = 120;

/// Write a scan result as a single JSON line.
pub fn write_json(result: &ScanResult, mut w: impl Write) -> std::io::Result<()> {
    serde_json::to_writer(&mut w, result)?;
    writeln!(w)?;
    Ok(())
}

pub fn write_resolve_json(result: &ResolveResult, mut w: impl Write) -> std::io::Result<()> {
    serde_json::to_writer(&mut w, result)?;
    writeln!(w)?;
    Ok(())
}

struct Palette {
    band: &'static str,
    dim: &'static str,
    reset: &'static str,
}

impl Palette {
    fn for_band(band: RiskBand, color: bool) -> Self {
        if !color {
            return Self::plain();
        }
        let band = match band {
            RiskBand::High => "\x1b[31m",
            RiskBand::Medium => "\x1b[33m",
            RiskBand::Low => "\x1b[32m",
        };
        Self {
            band,
            dim: "\x1b[90m",
            reset: "\x1b[0m",
        }
    }

    fn plain() -> Self {
        Self {
            band: "",
            dim: "",
            reset: "",
        }
    }
}

fn severity_color(severity: Severity, color: bool) -> &'static str {
    if !color {
        return "";
    }
    match severity {
        Severity::High => "\x1b[31m",
        Severity::Medium => "\x1b[33m",
        Severity::Low => "\x1b[36m",
    }
}

fn band_label(band: RiskBand) -> &'static str {
    match band {
        RiskBand::High => "HIGH RISK",
        RiskBand::Medium => "CAUTION",
        RiskBand::Low => "LOW RISK",
    }
}

/// Human-readable scan result.
pub fn write_human(result: &ScanResult, color: bool, mut w: impl Write) -> std::io::Result<()> {
    let p = Palette::for_band(result.risk_band, color);

    writeln!(
        w,
        "phishwatch: {}{}{} (score {}, {})",
        p.band,
        band_label(result.risk_band),
        p.reset,
        result.risk_score,
        result.verdict
    )?;
    writeln!(w, "  {}", result.summary)?;
    writeln!(w, "  {}url:{}   {}", p.dim, p.reset, truncate_chars(&result.input_url, MAX_URL_CHARS))?;
    if result.final_url != result.input_url {
        writeln!(w, "  {}final:{} {}", p.dim, p.reset, truncate_chars(&result.final_url, MAX_URL_CHARS))?;
    }
    if result.redirect_chain.len() > 1 {
        writeln!(w, "  {}chain:{}", p.dim, p.reset)?;
        for (i, hop) in result.redirect_chain.iter().enumerate() {
            writeln!(w, "    {}. {}", i + 1, truncate_chars(hop, MAX_URL_CHARS))?;
        }
    }
    if result.treadmill_escalated {
        writeln!(w, "  {}credential relay pattern detected{}", p.band, p.reset)?;
    }

    if !result.signals.is_empty() {
        writeln!(w)?;
    }
    for signal in &result.signals {
        let c = severity_color(signal.severity, color);
        writeln!(w, "  {c}[{}]{} {}", signal.severity, p.reset, signal.id)?;
        writeln!(w, "    {}", signal.explanation)?;
    }

    if result.risk_band == RiskBand::High {
        writeln!(w, "  Recommendation: do not open this link or enter any credentials.")?;
    }
    Ok(())
}

/// Human-readable resolver result.
pub fn write_resolve_human(result: &ResolveResult, mut w: impl Write) -> std::io::Result<()> {
    let status = if result.resolved { "resolved" } else { "unresolved" };
    writeln!(w, "phishwatch: {status}")?;
    for (i, hop) in result.redirect_chain.iter().enumerate() {
        writeln!(w, "  {}. {}", i + 1, truncate_chars(hop, MAX_URL_CHARS))?;
    }
    if result.input_is_shortener {
        writeln!(w, "  input is a known URL shortener")?;
    }
    if result.input_is_marketing || result.final_is_marketing {
        writeln!(
            w,
            "  marketing infrastructure: input={} final={}",
            result.input_is_marketing, result.final_is_marketing
        )?;
    }
    if let Some(error) = &result.error {
        writeln!(w, "  error: {error}")?;
    }
    Ok(())
}

/// Write to stdout, colored only when stdout is a terminal.
pub fn write_human_auto(result: &ScanResult) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let color = is_terminal::is_terminal(&stdout);
    write_human(result, color, stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{assess, CheckRequest};
    use crate::allowlist::MarketingAllowlist;
    use crate::resolver::ResolveError;

    fn sample() -> ScanResult {
        let req = CheckRequest::new("http://203.0.113.5/login");
        let resolved =
            ResolveResult::failed(&req.input_url, &MarketingAllowlist::empty(), ResolveError::BlockedHost);
        assess(&req, &resolved)
    }

    #[test]
    fn test_json_is_single_line() {
        let mut buf = Vec::new();
        write_json(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["risk_band"], "high");
    }

    #[test]
    fn test_human_without_color_has_no_escapes() {
        let mut buf = Vec::new();
        write_human(&sample(), false, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("phishwatch: HIGH RISK"));
        assert!(text.contains("[high] ip_in_url"));
        assert!(text.contains("Recommendation"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_human_with_color() {
        let mut buf = Vec::new();
        write_human(&sample(), true, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\x1b[31m"));
    }

    #[test]
    fn test_resolve_human_shows_error() {
        let result = ResolveResult::failed(
            "http://127.0.0.1/",
            &MarketingAllowlist::empty(),
            ResolveError::BlockedHost,
        );
        let mut buf = Vec::new();
        write_resolve_human(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("unresolved"));
        assert!(text.contains("blocked_host"));
    }
}
