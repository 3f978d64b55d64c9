use std::path::Path;

use phishwatch_core::output;

pub fn run(url: &str, json: bool, allowlist: Option<&Path>) -> i32 {
    let (runtime, resolver) = match super::setup(allowlist, None) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("phishwatch: {e}");
            return super::EXIT_ERROR;
        }
    };

    let result = runtime.block_on(resolver.resolve(url));

    let stdout = std::io::stdout();
    let written = if json {
        output::write_resolve_json(&result, stdout.lock())
    } else {
        output::write_resolve_human(&result, stdout.lock())
    };
    if let Err(e) = written {
        eprintln!("phishwatch: failed to write output: {e}");
    }

    if result.resolved {
        0
    } else {
        2
    }
}
