//! Endpoint detection: given a tenant's career-page URL, work out which
//! data-access strategy the tenant's deployment exposes.
//!
//! Probes run in a fixed priority order, most structured source first:
//! the PublicReports JSON endpoint yields complete, cheaply paginated data;
//! the SearchJobs form yields paginated HTML; the raw-markup fallback only
//! yields job ids and forces per-record detail fetches later.

mod fallback;
mod report;
mod search_form;

pub use fallback::FallbackScrapeProbe;
pub use report::ReportProbe;
pub use search_form::SearchFormProbe;

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::fetch::Fetcher;
use crate::models::detection::DetectionResult;

/// A fetched career page handed to each probe.
pub struct CareerPage {
    pub tenant: String,
    pub url: String,
    pub html: String,
}

/// One hypothesis about how a tenant exposes job data.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspect the page and return a detection result if the hypothesis
    /// holds. `None` hands over to the next probe.
    async fn probe(&self, page: &CareerPage, fetcher: &dyn Fetcher) -> Option<DetectionResult>;
}

pub struct DetectionEngine {
    probes: Vec<Box<dyn EndpointProbe>>,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionEngine {
    /// Engine with the standard probe order: report endpoint, search form,
    /// raw-markup fallback.
    pub fn new() -> Self {
        Self {
            probes: vec![
                Box::new(ReportProbe),
                Box::new(SearchFormProbe),
                Box::new(FallbackScrapeProbe),
            ],
        }
    }

    /// Probe one tenant. Fetch problems short-circuit before any probe runs.
    pub async fn detect(&self, fetcher: &dyn Fetcher, tenant: &str, url: &str) -> DetectionResult {
        let page = match fetcher.get(url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{tenant}: career page fetch failed: {e}");
                return DetectionResult::failed(tenant, url, ErrorKind::FetchFailed);
            }
        };

        if !page.is_ok() {
            return DetectionResult::failed(tenant, url, ErrorKind::Http(page.status));
        }

        let page = CareerPage {
            tenant: tenant.to_string(),
            url: url.to_string(),
            html: page.body,
        };

        for probe in &self.probes {
            if let Some(result) = probe.probe(&page, fetcher).await {
                tracing::info!(
                    "{tenant}: probe '{}' matched ({:?})",
                    probe.name(),
                    result.status
                );
                return result;
            }
        }

        DetectionResult::failed(tenant, url, ErrorKind::NoPatternDetected)
    }
}
