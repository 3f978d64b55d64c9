use std::path::PathBuf;
use std::time::Duration;

use phishwatch_core::engine::{self, CheckRequest};
use phishwatch_core::output;

pub struct CheckArgs {
    pub url: String,
    pub json: bool,
    pub redirect_count: Option<u32>,
    pub marketing: bool,
    pub allowlist: Option<PathBuf>,
    pub timeout_ms: u64,
}

pub fn run(args: CheckArgs) -> i32 {
    let (runtime, resolver) = match super::setup(
        args.allowlist.as_deref(),
        Some(Duration::from_millis(args.timeout_ms)),
    ) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("phishwatch: {e}");
            return super::EXIT_ERROR;
        }
    };

    let request = CheckRequest {
        input_url: args.url,
        redirect_count: args.redirect_count,
        is_marketing_infra: args.marketing,
        ..CheckRequest::default()
    };
    let result = runtime.block_on(engine::check(&request, &resolver));

    let written = if args.json {
        output::write_json(&result, std::io::stdout().lock())
    } else {
        output::write_human_auto(&result)
    };
    if let Err(e) = written {
        eprintln!("phishwatch: failed to write output: {e}");
    }

    result.risk_band.exit_code()
}
