//! Second-stage crawl for Partial detection results: only a sample of job
//! ids is known, so each one costs a full detail-page fetch.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::config::ScrapeSettings;
use crate::error::ErrorKind;
use crate::fetch::Fetcher;
use crate::models::detection::DetectionResult;
use crate::models::job::JobRecord;
use crate::normalize::clean_text;
use crate::scrape::page_delay;

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static CLASSED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").unwrap());

static TITLE_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)job.*title").unwrap());
static LOCATION_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)location").unwrap());
static DESCRIPTION_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)description|content|summary|details").unwrap());

type FieldHeuristic = fn(&Html) -> Option<String>;

fn h1_text(document: &Html) -> Option<String> {
    document
        .select(&H1)
        .next()
        .map(|e| e.text().collect::<String>())
}

fn class_text(document: &Html, pattern: &Regex) -> Option<String> {
    document
        .select(&CLASSED)
        .find(|e| e.value().attr("class").is_some_and(|c| pattern.is_match(c)))
        .map(|e| e.text().collect::<String>())
}

fn title_class_text(document: &Html) -> Option<String> {
    class_text(document, &TITLE_CLASS)
}

fn location_class_text(document: &Html) -> Option<String> {
    class_text(document, &LOCATION_CLASS)
}

fn description_class_text(document: &Html) -> Option<String> {
    class_text(document, &DESCRIPTION_CLASS)
}

/// Per-field heuristics, first match wins.
const TITLE_HEURISTICS: &[FieldHeuristic] = &[h1_text, title_class_text];
const LOCATION_HEURISTICS: &[FieldHeuristic] = &[location_class_text];
const DESCRIPTION_HEURISTICS: &[FieldHeuristic] = &[description_class_text];

fn resolve_field(document: &Html, heuristics: &[FieldHeuristic]) -> Option<String> {
    heuristics
        .iter()
        .find_map(|h| h(document).map(|text| clean_text(&text)))
        .filter(|text| !text.is_empty())
}

/// Best-effort extraction from one detail page; discarded without a title.
fn job_from_detail_page(body: &str, tenant: &str, job_id: &str, url: &str) -> Option<JobRecord> {
    let document = Html::parse_document(body);
    let title = resolve_field(&document, TITLE_HEURISTICS)?;

    let mut record = JobRecord::new(tenant, title);
    record.job_id = Some(job_id.to_string());
    record.job_url = Some(url.to_string());
    record.location = resolve_field(&document, LOCATION_HEURISTICS);
    record.job_description = resolve_field(&document, DESCRIPTION_HEURISTICS);
    Some(record)
}

/// Fetch each sample id's detail page. Login redirects are skipped, not
/// fatal: the tenant keeps whatever pages are public.
pub async fn crawl_samples(
    fetcher: &dyn Fetcher,
    detection: &DetectionResult,
    settings: &ScrapeSettings,
) -> Vec<JobRecord> {
    let tenant = &detection.tenant;
    let mut records = Vec::new();

    for job_id in &detection.sample_job_ids {
        let url = format!("{}/JobDetail/{job_id}", detection.career_url);

        let response = match fetcher.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("{tenant}: job {job_id} fetch failed: {e}");
                continue;
            }
        };

        let landed = response.final_url.to_lowercase();
        if landed.contains("login") || landed.contains("signin") {
            tracing::warn!(
                "{tenant}: job {job_id} skipped ({})",
                ErrorKind::AuthRequired
            );
            continue;
        }
        if !response.is_ok() {
            continue;
        }

        if let Some(record) = job_from_detail_page(&response.body, tenant, job_id, &url) {
            records.push(record);
        }

        page_delay(settings).await;
    }

    tracing::info!(
        "{tenant}: {} of {} sample jobs recovered from detail pages",
        records.len(),
        detection.sample_job_ids.len()
    );
    records
}
