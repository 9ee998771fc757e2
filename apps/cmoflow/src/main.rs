//! # cmoflow
//!
//! The command-line runner for the cmoflow session engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   apps/cmoflow (THE BINARY)               │
//! │                                                           │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────────┐   │
//! │  │    CLI      │   │   Intake    │   │  Clock Driver  │   │
//! │  │   (clap)    │   │  (fs, toml) │   │    (tokio)     │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬────────┘   │
//! │         └─────────────────┼──────────────────┘            │
//! │                           ▼                               │
//! │                  ┌────────────────┐                       │
//! │                  │  cmoflow-core  │                       │
//! │                  │  (THE LOGIC)   │                       │
//! │                  └────────────────┘                       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Classify files without processing
//! cmoflow classify me.png deck.pdf
//!
//! # Run the whole session, jumping the virtual clock
//! cmoflow run me.png deck.pdf
//!
//! # Run in real time, resetting after three seconds
//! cmoflow run --realtime --reset-after 3000 me.png
//! ```

use clap::Parser;
use cmoflow::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing. CMOFLOW_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CMOFLOW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "cmoflow=debug,cmoflow_core=debug"
    } else {
        "cmoflow=info,cmoflow_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so stdout stays clean for --json-mode.
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

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the cmoflow startup banner.
fn print_banner() {
    println!(
        r#"
  cmoflow v{}

  Intake • Processing • Reveal
"#,
        env!("CARGO_PKG_VERSION")
    );
}
