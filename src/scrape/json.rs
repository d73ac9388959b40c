use serde_json::Value;

use crate::error::ScrapeError;
use crate::normalize::job_from_json;
use crate::scrape::{ListingDriver, ParsedPage, build_page_url};

/// Field names under which this platform's JSON endpoints have been seen
/// to hold the record list, in tie-break order.
const LIST_FIELDS: &[&str] = &["jobs", "items", "results", "data", "jobList", "rows"];

/// Pagination over a JSON reporting endpoint.
pub struct JsonDriver {
    tenant: String,
    endpoint: String,
    pagination_param: String,
    page_size_param: String,
    page_size: u32,
    base_url: String,
}

impl JsonDriver {
    pub fn new(
        tenant: &str,
        endpoint: String,
        pagination_param: &str,
        page_size_param: &str,
        page_size: u32,
    ) -> Self {
        let base_url = derive_base_url(&endpoint);
        Self {
            tenant: tenant.to_string(),
            endpoint,
            pagination_param: pagination_param.to_string(),
            page_size_param: page_size_param.to_string(),
            page_size,
            base_url,
        }
    }
}

/// Job URLs are synthesized relative to the site root, not the reports
/// path, so strip the reporting suffix when present.
fn derive_base_url(endpoint: &str) -> String {
    if let Some((prefix, _)) = endpoint.split_once("PublicReports") {
        return prefix.trim_end_matches('/').to_string();
    }
    match endpoint.rsplit_once('/') {
        Some((prefix, _)) if prefix.len() > "https:/".len() => prefix.to_string(),
        _ => endpoint.to_string(),
    }
}

impl ListingDriver for JsonDriver {
    fn tenant(&self) -> &str {
        &self.tenant
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn page_url(&self, offset: u32) -> String {
        build_page_url(
            &self.endpoint,
            &self.pagination_param,
            &self.page_size_param,
            offset,
            self.page_size,
        )
    }

    fn parse_page(&self, body: &str) -> Result<ParsedPage, ScrapeError> {
        let data: Value =
            serde_json::from_str(body).map_err(|e| ScrapeError::parse(e.to_string()))?;

        let items: &[Value] = match &data {
            Value::Array(items) => items,
            Value::Object(_) => LIST_FIELDS
                .iter()
                .find_map(|f| data.get(*f).and_then(Value::as_array))
                .map(Vec::as_slice)
                .unwrap_or_default(),
            _ => &[],
        };

        let records = items
            .iter()
            .filter_map(|item| job_from_json(item, &self.tenant, &self.base_url))
            .collect();

        Ok(ParsedPage {
            records,
            raw_count: items.len(),
        })
    }
}
