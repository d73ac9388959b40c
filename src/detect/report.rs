use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::detect::{CareerPage, EndpointProbe};
use crate::fetch::Fetcher;
use crate::models::detection::{Confidence, DetectionResult, EndpointConfig, Strategy};

static REPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/PublicReports/(\d+)/json").unwrap());

/// Field names the reporting endpoint uses for its record list.
const RECORDS_FIELDS: &[&str] = &["rows", "data"];

/// Looks for a numeric PublicReports feed id in the page markup and
/// verifies the candidate endpoint with one minimal test request before
/// accepting it.
pub struct ReportProbe;

#[async_trait]
impl EndpointProbe for ReportProbe {
    fn name(&self) -> &'static str {
        "public_reports"
    }

    async fn probe(&self, page: &CareerPage, fetcher: &dyn Fetcher) -> Option<DetectionResult> {
        let report_id = REPORT_PATTERN.captures(&page.html)?[1].to_string();
        let endpoint = format!("https://{}/PublicReports/{report_id}/json", page.tenant);

        let test_url = format!("{endpoint}?offset=0&recordsPerPage=1");
        let response = match fetcher.get(&test_url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("{}: report endpoint test failed: {e}", page.tenant);
                return None;
            }
        };
        if !response.is_ok() {
            return None;
        }

        // Accept only bodies that are JSON and expose a known records field.
        let data: Value = serde_json::from_str(&response.body).ok()?;
        if !RECORDS_FIELDS.iter().any(|f| data.get(*f).is_some()) {
            return None;
        }

        Some(DetectionResult::success(
            &page.tenant,
            &page.url,
            EndpointConfig {
                strategy: Strategy::ReportJson,
                endpoint,
                pagination_param: "offset",
                page_size_param: "recordsPerPage",
                default_page_size: 1000,
                confidence: Confidence::High,
                method: None,
            },
        ))
    }
}
