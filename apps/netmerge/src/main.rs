//! # netmerge
//!
//! The command-line binary of the netmerge network merge engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/netmerge (THE BINARY)         │
//! │                                               │
//! │  ┌─────────────┐          ┌───────────────┐  │
//! │  │   CLI       │          │    Config     │  │
//! │  │  (clap)     │          │    (toml)     │  │
//! │  └──────┬──────┘          └───────┬───────┘  │
//! │         └────────────┬────────────┘          │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │ netmerge-core │               │
//! │              │ (THE ENGINE)  │               │
//! │              └───────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! netmerge merge a.json b.json -t union -o merged.json
//! netmerge merge a.json b.json -t difference --strict --identity-for b=symbol
//! netmerge inspect a.json b.json
//! netmerge init-config
//! ```

use clap::Parser;
use netmerge::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // NETMERGE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("NETMERGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "netmerge=debug,netmerge_core=debug"
    } else {
        "netmerge=info,netmerge_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!(category = ?e.category(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner (stderr, so stdout stays parseable).
fn print_banner() {
    eprintln!(
        "netmerge v{} - union, intersection and difference of networks",
        env!("CARGO_PKG_VERSION")
    );
}
