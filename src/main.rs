mod config;
mod detect;
mod error;
mod fetch;
mod limiter;
mod models;
mod normalize;
mod runner;
mod scrape;
#[cfg(test)]
mod testutil;

use std::fs;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::{Command, Config};
use crate::runner::Site;

/// Parse the sites file: one career-page URL per line, '#' comments and
/// blank lines skipped; the tenant is the URL host.
fn load_sites(path: &str) -> anyhow::Result<Vec<Site>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read sites file {path}"))?;

    let mut sites = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let url = Url::parse(line).with_context(|| format!("invalid site URL: {line}"))?;
        let tenant = url
            .host_str()
            .with_context(|| format!("site URL has no host: {line}"))?
            .to_string();
        sites.push(Site {
            tenant,
            url: line.to_string(),
        });
    }

    anyhow::ensure!(!sites.is_empty(), "no site URLs in {path}");
    Ok(sites)
}

fn write_json<T: serde::Serialize>(path: &str, value: &T) -> anyhow::Result<()> {
    let file = fs::File::create(path).with_context(|| format!("failed to create {path}"))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscout=info")),
        )
        .init();

    let config = Config::parse();
    let settings = config.settings()?;
    let sites = load_sites(&config.sites)?;
    tracing::info!("Loaded {} sites from {}", sites.len(), config.sites);

    match config.resolved_command() {
        Command::Detect => {
            let results = runner::detect_sites(&sites, &settings).await;
            write_json(&config.output, &results)?;
            tracing::info!("Wrote {} detection results to {}", results.len(), config.output);
        }
        Command::Scrape => {
            let outcomes = runner::scrape_sites(&sites, &settings).await;
            let records: Vec<_> = outcomes.iter().flat_map(|o| o.records.iter()).collect();
            write_json(&config.output, &records)?;
            tracing::info!("Wrote {} jobs to {}", records.len(), config.output);
        }
    }

    Ok(())
}
