//! Extract a saved HTML page to Markdown
//!
//! ```text
//! cargo run --example extract_file -- page.html [https://example.com/page] [--json]
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use web_markdown_extractor::{ConversionOptions, extract_bytes};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();

    let mut json = false;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            positional.push(arg);
        }
    }
    let Some(path) = positional.first() else {
        eprintln!("usage: extract_file <page.html> [base-url] [--json]");
        return ExitCode::from(2);
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(path = %path, %err, "cannot read input");
            return ExitCode::FAILURE;
        }
    };
    let options = ConversionOptions {
        base_url: positional.get(1).cloned(),
        ..Default::default()
    };

    let extraction = match extract_bytes(&bytes, None, &options) {
        Ok(extraction) => extraction,
        Err(err) => {
            error!(kind = err.kind(), %err, "extraction failed");
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&extraction) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                error!(%err, "cannot serialize extraction");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", extraction.conversion.to_document());
    }
    ExitCode::SUCCESS
}
