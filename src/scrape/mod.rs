//! Pagination drivers: walk a detected endpoint page by page, normalize
//! and deduplicate as we go, and stop when the server runs dry or starts
//! misbehaving.
//!
//! Termination is one of: page cap, non-200 response, duplicate flood
//! (the server is ignoring offsets and re-serving page 0), or two
//! consecutive pages with nothing new. Whatever accumulated by then is
//! the result; there is no success/failure verdict at loop end.

pub mod detail;
mod html;
mod json;

pub use html::HtmlDriver;
pub use json::JsonDriver;

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use regex::Regex;

use crate::config::ScrapeSettings;
use crate::error::ScrapeError;
use crate::fetch::Fetcher;
use crate::models::detection::{DetectionResult, DetectionStatus, Strategy};
use crate::models::job::JobRecord;

/// One page of listings after normalization. `raw_count` counts source
/// items before title filtering; it is the duplicate-rate denominator.
pub struct ParsedPage {
    pub records: Vec<JobRecord>,
    pub raw_count: usize,
}

/// One full-extraction strategy: knows how to address a page and how to
/// turn its body into records. Fetching, dedup and termination live in
/// the shared loop.
pub trait ListingDriver: Send + Sync {
    fn tenant(&self) -> &str;
    fn page_size(&self) -> u32;
    fn page_url(&self, offset: u32) -> String;
    fn parse_page(&self, body: &str) -> Result<ParsedPage, ScrapeError>;
}

/// Select and run the driver matching a detection result. Failed results
/// yield no records; Partial results go through the detail-page crawl.
pub async fn extract(
    fetcher: &dyn Fetcher,
    detection: &DetectionResult,
    settings: &ScrapeSettings,
) -> Result<Vec<JobRecord>, ScrapeError> {
    match detection.status {
        DetectionStatus::Partial => Ok(detail::crawl_samples(fetcher, detection, settings).await),
        DetectionStatus::Failed => Ok(Vec::new()),
        DetectionStatus::Success => {
            let Some(endpoint) = detection.endpoint.clone() else {
                return Ok(Vec::new());
            };
            match detection.strategy {
                Some(Strategy::ReportJson) => {
                    let driver = JsonDriver::new(
                        &detection.tenant,
                        endpoint,
                        &detection.pagination_param,
                        &detection.page_size_param,
                        detection.default_page_size,
                    );
                    run_paginated(fetcher, &driver, settings).await
                }
                Some(Strategy::SearchFormHtml) | Some(Strategy::FallbackHtml) => {
                    let driver = HtmlDriver::new(
                        &detection.tenant,
                        endpoint,
                        &detection.pagination_param,
                        &detection.page_size_param,
                        detection.default_page_size,
                    );
                    run_paginated(fetcher, &driver, settings).await
                }
                None => Ok(Vec::new()),
            }
        }
    }
}

/// Shared pagination loop over any listing driver.
pub async fn run_paginated(
    fetcher: &dyn Fetcher,
    driver: &dyn ListingDriver,
    settings: &ScrapeSettings,
) -> Result<Vec<JobRecord>, ScrapeError> {
    let tenant = driver.tenant();
    let page_size = driver.page_size().max(1);

    let mut records: Vec<JobRecord> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut consecutive_empty = 0u32;

    for page in 0..settings.max_pages {
        let offset = page * page_size;
        let url = driver.page_url(offset);

        let response = match fetcher.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("{tenant}: page {} fetch failed: {e}", page + 1);
                break;
            }
        };
        if !response.is_ok() {
            tracing::info!(
                "{tenant}: HTTP {} at page {}, stopping",
                response.status,
                page + 1
            );
            break;
        }

        let parsed = match driver.parse_page(&response.body) {
            Ok(parsed) => parsed,
            // A first page that does not parse means the endpoint is not
            // what detection thought; later pages just count as empty.
            Err(e) if page == 0 => return Err(e),
            Err(e) => {
                tracing::warn!("{tenant}: page {} did not parse: {e}", page + 1);
                ParsedPage {
                    records: Vec::new(),
                    raw_count: 0,
                }
            }
        };

        let mut page_new: Vec<JobRecord> = Vec::new();
        let mut duplicates = 0usize;
        for record in parsed.records {
            match &record.job_id {
                Some(id) if seen_ids.contains(id) => duplicates += 1,
                Some(id) => {
                    seen_ids.insert(id.clone());
                    page_new.push(record);
                }
                // No id, nothing to dedup on: always counts as new.
                None => page_new.push(record),
            }
        }

        if parsed.raw_count > 0 {
            let duplicate_rate = duplicates as f64 / parsed.raw_count as f64;
            if duplicate_rate > settings.duplicate_threshold {
                // The server is re-serving the same records regardless of
                // offset. The flooded page is not trustworthy; drop it.
                tracing::warn!(
                    "{tenant}: page {} is {:.0}% duplicates, pagination not respected, stopping",
                    page + 1,
                    duplicate_rate * 100.0
                );
                break;
            }
        }

        if page_new.is_empty() {
            consecutive_empty += 1;
            if consecutive_empty >= settings.max_empty_pages {
                tracing::info!(
                    "{tenant}: no new jobs for {consecutive_empty} pages, stopping"
                );
                break;
            }
        } else {
            consecutive_empty = 0;
        }

        tracing::info!(
            "{tenant}: page {} - {} new, {duplicates} duplicates (total {})",
            page + 1,
            page_new.len(),
            records.len() + page_new.len()
        );
        records.extend(page_new);

        page_delay(settings).await;
    }

    Ok(records)
}

/// Jittered pause between page fetches, on top of the rate limiter.
pub(crate) async fn page_delay(settings: &ScrapeSettings) {
    let (min, max) = settings.page_delay_secs;
    if max <= 0.0 || max < min {
        return;
    }
    let secs = rand::rng().random_range(min..=max);
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

/// Substitute pagination parameters into an endpoint template: explicit
/// `{offset}`/`{limit}` placeholders first, then in-place rewrite of
/// existing `param=N` pairs, else appended as a query string.
pub(crate) fn build_page_url(
    template: &str,
    pagination_param: &str,
    page_size_param: &str,
    offset: u32,
    page_size: u32,
) -> String {
    if template.contains("{offset}") {
        return template
            .replace("{offset}", &offset.to_string())
            .replace("{limit}", &page_size.to_string());
    }

    let pagination_re = Regex::new(&format!("{}=\\d+", regex::escape(pagination_param)))
        .expect("escaped param name is a valid pattern");
    if pagination_re.is_match(template) {
        let page_size_re = Regex::new(&format!("{}=\\d+", regex::escape(page_size_param)))
            .expect("escaped param name is a valid pattern");
        let url = pagination_re
            .replace(template, format!("{pagination_param}={offset}"))
            .into_owned();
        return page_size_re
            .replace(&url, format!("{page_size_param}={page_size}"))
            .into_owned();
    }

    let separator = if template.contains('?') { '&' } else { '?' };
    format!("{template}{separator}{pagination_param}={offset}&{page_size_param}={page_size}")
}
