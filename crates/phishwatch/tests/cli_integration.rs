use std::process::Command;

fn phishwatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_phishwatch"));
    cmd.env_remove("MARKETING_ALLOWLIST_PATH");
    cmd
}

fn json_output(out: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be JSON")
}

// ─── check ───

#[test]
fn check_loopback_login_is_high_risk() {
    let out = phishwatch()
        .args(["check", "--json", "http://127.0.0.1/login"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(1), "high band should exit 1");

    let v = json_output(&out);
    assert_eq!(v["risk_band"], "high");
    assert_eq!(v["user_action"], "avoid");
    assert_eq!(v["domain"], "127.0.0.1");
    assert_eq!(v["uses_https"], false);

    let ids: Vec<&str> = v["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"ip_in_url"));
    assert!(ids.contains(&"credential_keywords"));
    assert!(ids.contains(&"insecure_http"));
    assert!(ids.contains(&"resolution_failed"));
}

#[test]
fn check_human_output() {
    let out = phishwatch()
        .args(["check", "http://127.0.0.1/login"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("HIGH RISK"), "got: {stdout}");
    assert!(stdout.contains("ip_in_url"));
    assert!(!stdout.contains('\x1b'), "piped output must not be colored");
}

#[test]
fn check_runtime_redirects_raise_band_to_medium() {
    let out = phishwatch()
        .args(["check", "--json", "--redirect-count", "2", "http://localhost/"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(2), "medium band should exit 2");

    let v = json_output(&out);
    assert_eq!(v["risk_band"], "medium");
    assert_eq!(v["user_action"], "review");
    let ids: Vec<&str> = v["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"runtime_multi_redirect"));
}

#[test]
fn check_marketing_flag_downgrades_redirect_only_band() {
    let out = phishwatch()
        .args([
            "check",
            "--json",
            "--marketing",
            "--redirect-count",
            "2",
            "http://localhost/",
        ])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(0));
    let v = json_output(&out);
    assert_eq!(v["risk_band"], "low");
    assert!(v["summary"].as_str().unwrap().contains("marketing"));
}

#[test]
fn check_marketing_flag_never_hides_address_literal() {
    let out = phishwatch()
        .args(["check", "--json", "--marketing", "http://127.0.0.1/"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(json_output(&out)["risk_band"], "high");
}

#[test]
fn check_tolerates_missing_allowlist() {
    let out = phishwatch()
        .args([
            "check",
            "--json",
            "--allowlist",
            "/nonexistent/allowlist.json",
            "http://127.0.0.1/",
        ])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(json_output(&out)["risk_band"], "high");
}

#[test]
fn check_uses_marketing_allowlist_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allowlist.json");
    std::fs::write(&path, r#"{"categories": {"esp": ["localhost"]}}"#).unwrap();

    let out = phishwatch()
        .args(["check", "--json", "--allowlist"])
        .arg(&path)
        .arg("http://localhost/")
        .output()
        .expect("failed to run phishwatch");
    let v = json_output(&out);
    assert_eq!(v["input_is_marketing"], true);
    assert_eq!(v["final_is_marketing"], true);
}

#[test]
fn check_allowlist_match_does_not_downgrade_without_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allowlist.json");
    std::fs::write(&path, r#"{"categories": {"esp": ["localhost"]}}"#).unwrap();

    let out = phishwatch()
        .args(["check", "--json", "--redirect-count", "2", "--allowlist"])
        .arg(&path)
        .arg("http://localhost/")
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(2));
    let v = json_output(&out);
    assert_eq!(v["input_is_marketing"], true);
    assert_eq!(v["risk_band"], "medium");
}

// ─── resolve ───

#[test]
fn resolve_metadata_address_is_blocked() {
    let out = phishwatch()
        .args(["resolve", "--json", "http://169.254.169.254/"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(2), "unresolved should exit 2");

    let v = json_output(&out);
    assert_eq!(v["resolved"], false);
    assert_eq!(v["final_url"], "http://169.254.169.254/");
    assert!(v["error"].as_str().unwrap().starts_with("blocked_host"));
}

#[test]
fn resolve_rejects_unsupported_scheme() {
    let out = phishwatch()
        .args(["resolve", "--json", "ftp://example.com/file"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(2));
    let v = json_output(&out);
    assert!(v["error"].as_str().unwrap().starts_with("unsupported_scheme"));
}

#[test]
fn resolve_human_output() {
    let out = phishwatch()
        .args(["resolve", "http://127.0.0.1/"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("unresolved"));
    assert!(stdout.contains("blocked_host"));
}

// ─── usage ───

#[test]
fn missing_subcommand_is_usage_error() {
    let out = phishwatch().output().expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(64), "usage errors must not look like a medium verdict");
    assert!(!out.stderr.is_empty());
}

#[test]
fn unknown_flag_is_usage_error() {
    let out = phishwatch()
        .args(["check", "--bogus", "http://127.0.0.1/"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn help_exits_zero() {
    let out = phishwatch()
        .args(["--help"])
        .output()
        .expect("failed to run phishwatch");
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("check"));
}
