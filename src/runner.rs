use std::sync::Arc;

use serde::Serialize;

use crate::config::ScrapeSettings;
use crate::detect::DetectionEngine;
use crate::error::ErrorKind;
use crate::fetch::{FetchClient, Fetcher};
use crate::limiter::RateLimiter;
use crate::models::detection::{DetectionResult, DetectionStatus};
use crate::models::job::JobRecord;
use crate::scrape;

/// One career site to process: tenant domain plus its career-page URL.
#[derive(Debug, Clone)]
pub struct Site {
    pub tenant: String,
    pub url: String,
}

/// Everything harvested from one tenant, failures included.
#[derive(Debug, Serialize)]
pub struct TenantOutcome {
    pub tenant: String,
    pub detection: DetectionResult,
    pub records: Vec<JobRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

/// Build the per-tenant fetch client. Each tenant owns its limiter, so
/// independent tenants never throttle each other.
fn client_for(settings: &ScrapeSettings) -> FetchClient {
    let limiter = Arc::new(RateLimiter::new(settings.requests_per_second));
    FetchClient::new(limiter, settings.timeout_secs, settings.max_retries)
}

/// Detect only: probe every site and report the configurations found.
pub async fn detect_sites(sites: &[Site], settings: &ScrapeSettings) -> Vec<DetectionResult> {
    let engine = DetectionEngine::new();
    let mut results = Vec::with_capacity(sites.len());

    for site in sites {
        let client = client_for(settings);
        let result = engine.detect(&client, &site.tenant, &site.url).await;
        tracing::info!(
            "{}: {:?} ({})",
            site.tenant,
            result.status,
            result
                .strategy
                .map(|s| format!("{s:?}"))
                .unwrap_or_else(|| "no strategy".into())
        );
        results.push(result);
    }

    results
}

/// Full run: detect, then drive the matching extraction strategy. One
/// tenant's failure never blocks the rest of the batch.
pub async fn scrape_sites(sites: &[Site], settings: &ScrapeSettings) -> Vec<TenantOutcome> {
    let engine = DetectionEngine::new();
    let mut outcomes = Vec::with_capacity(sites.len());

    for site in sites {
        tracing::info!("Scraping {}...", site.tenant);
        let client = client_for(settings);
        outcomes.push(process_site(&engine, &client, site, settings).await);
    }

    let total: usize = outcomes.iter().map(|o| o.records.len()).sum();
    tracing::info!("Collected {total} jobs across {} sites", sites.len());
    outcomes
}

async fn process_site(
    engine: &DetectionEngine,
    fetcher: &dyn Fetcher,
    site: &Site,
    settings: &ScrapeSettings,
) -> TenantOutcome {
    let detection = engine.detect(fetcher, &site.tenant, &site.url).await;

    if detection.status == DetectionStatus::Failed {
        tracing::warn!(
            "{}: detection failed ({})",
            site.tenant,
            detection
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into())
        );
        return TenantOutcome {
            tenant: site.tenant.clone(),
            error: detection.error,
            detection,
            records: Vec::new(),
        };
    }

    match scrape::extract(fetcher, &detection, settings).await {
        Ok(records) => {
            tracing::info!("{}: collected {} unique jobs", site.tenant, records.len());
            TenantOutcome {
                tenant: site.tenant.clone(),
                detection,
                records,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!("{}: extraction failed: {e}", site.tenant);
            TenantOutcome {
                tenant: site.tenant.clone(),
                detection,
                records: Vec::new(),
                error: Some(e.kind()),
            }
        }
    }
}
