//! # Tally - Interaction Summary Pipeline
//!
//! The main binary for the Tally batch pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Full run with the default layout
//! tally run
//!
//! # Reproducible data, custom configuration
//! tally -c pipeline.toml generate --seed 42
//!
//! # Re-derive the views only
//! tally transform --clean-db-path raw_db.db --clean-table-name raw_interaction
//!
//! # Compare two runs
//! tally --json-mode hash
//! ```

use clap::Parser;
use tally::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing. TALLY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TALLY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "tally=debug"
    } else {
        "tally=info"
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

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
