mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "phishwatch",
    version,
    about = "Explainable phishing risk checks for links"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a link and classify its risk.
    /// Exit code: 0 low, 2 medium, 1 high
    Check {
        /// The URL to check (scheme optional)
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Redirects observed by the browser while loading the page
        #[arg(long)]
        redirect_count: Option<u32>,

        /// Treat the link as known marketing/tracking traffic
        #[arg(long)]
        marketing: bool,

        /// Marketing allowlist JSON file
        #[arg(long, env = "MARKETING_ALLOWLIST_PATH")]
        allowlist: Option<PathBuf>,

        /// Resolver deadline in milliseconds
        #[arg(long, default_value_t = 6000)]
        timeout_ms: u64,
    },

    /// Follow a link's redirects without scoring it.
    /// Exit code: 0 resolved, 2 unresolved
    Resolve {
        /// The URL to resolve (scheme optional)
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Marketing allowlist JSON file
        #[arg(long, env = "MARKETING_ALLOWLIST_PATH")]
        allowlist: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    // Usage errors get their own code; 2 already means "medium" / "unresolved".
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() { cli::EXIT_USAGE } else { 0 };
            std::process::exit(code);
        }
    };

    let exit_code = match cli.command {
        Commands::Check {
            url,
            json,
            redirect_count,
            marketing,
            allowlist,
            timeout_ms,
        } => cli::check::run(cli::check::CheckArgs {
            url,
            json,
            redirect_count,
            marketing,
            allowlist,
            timeout_ms,
        }),

        Commands::Resolve {
            url,
            json,
            allowlist,
        } => cli::resolve::run(&url, json, allowlist.as_deref()),
    };

    std::process::exit(exit_code);
}
