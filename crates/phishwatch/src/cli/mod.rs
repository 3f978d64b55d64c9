pub mod check;
pub mod resolve;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use phishwatch_core::allowlist::MarketingAllowlist;
use phishwatch_core::resolver::{Resolver, ResolverConfig};

/// Exit code for failures that prevented any verdict.
pub const EXIT_ERROR: i32 = 3;

/// Exit code for a malformed invocation (sysexits `EX_USAGE`).
pub const EXIT_USAGE: i32 = 64;

/// Build the resolver and a single-threaded runtime to drive it.
pub fn setup(
    allowlist: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<(tokio::runtime::Runtime, Resolver), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {e}"))?;

    let mut config = ResolverConfig::default();
    if let Some(timeout) = timeout {
        config.timeout = timeout;
    }
    let allowlist = Arc::new(MarketingAllowlist::load_or_empty(allowlist));
    let resolver = Resolver::new(config, allowlist).map_err(|e| e.to_string())?;
    Ok((runtime, resolver))
}
