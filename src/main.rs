//! # Autopost News
//!
//! A batch job that turns RSS news items into long-form articles on a CMS.
//! Meant to be started periodically by an external scheduler; it does one
//! pass and exits.
//!
//! ## Usage
//!
//! ```sh
//! MEITUAN_API_KEY=... UPLOAD_API_TOKEN=... autopost_news
//! ```
//!
//! ## Architecture
//!
//! The run is a strictly sequential pipeline:
//! 1. **Fetch**: download and parse the RSS feed
//! 2. **Filter**: keep items mentioning one of the configured keywords
//! 3. **Generate**: ask the completion API for a headline and a body, twice
//! 4. **Publish**: post a "tech" and a "news" article to the upload API
//!
//! Failures past startup degrade the run instead of aborting it; only
//! configuration errors produce a non-zero exit.

use clap::Parser;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod feed;
mod generate;
mod models;
mod pipeline;
mod publish;
mod utils;

#[cfg(test)]
mod test_support;

use api::{ChatClient, Retrying};
use cli::Cli;
use config::Config;
use feed::RssFeed;
use pipeline::{Outcome, RunReport};
use publish::{DryRun, UploadClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "autopost_news starting up");

    let args = Cli::parse();
    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let feed = RssFeed::new(&config.feed).map_err(error::ConfigError::from)?;
    let completion = Retrying::new(
        ChatClient::new(&config.completion).map_err(error::ConfigError::from)?,
        config.completion.max_retries,
        config.completion.retry_base_delay,
    );
    let mut rng = rand::rng();

    let report = if config.dry_run {
        warn!("Dry run enabled; articles will not be uploaded");
        pipeline::run(&feed, &completion, &DryRun, &config.keywords, &mut rng).await
    } else {
        let uploader = UploadClient::new(&config.upload).map_err(error::ConfigError::from)?;
        pipeline::run(&feed, &completion, &uploader, &config.keywords, &mut rng).await
    };

    log_report(&report);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn log_report(report: &RunReport) {
    for entry in &report.outcomes {
        match &entry.outcome {
            Outcome::Published { .. } => info!(
                category = %entry.category,
                title = %entry.title,
                source = %entry.source_title,
                outcome = %entry.outcome,
                "Article result"
            ),
            Outcome::Skipped { .. } | Outcome::Failed { .. } => warn!(
                category = %entry.category,
                title = %entry.title,
                source = %entry.source_title,
                outcome = %entry.outcome,
                "Article result"
            ),
        }
    }
    info!(
        fetched = report.fetched,
        matched = report.matched,
        attempted = report.outcomes.len(),
        published = report.published(),
        "Run summary"
    );
}
