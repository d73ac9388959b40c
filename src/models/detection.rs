use serde::Serialize;

use crate::error::ErrorKind;

/// Which data-access strategy a probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// PublicReports JSON reporting endpoint.
    ReportJson,
    /// SearchJobs HTML listing endpoint.
    SearchFormHtml,
    /// Raw career page, job ids scraped from markup.
    FallbackHtml,
}

/// How reliable the detected strategy is expected to be. Reporting only;
/// never consulted by control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// A full-extraction endpoint was found.
    Success,
    /// Only a sample of job ids was recovered; full records need a
    /// second-stage detail-page crawl.
    Partial,
    Failed,
}

/// How the SearchJobs endpoint was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    FormDetection,
    PathGuessing,
}

/// Outcome of probing one tenant's career page.
///
/// Built through the constructors below, which keep the invariants:
/// Success carries an endpoint and a strategy, Partial carries a non-empty
/// id sample, Failed carries an error kind.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub tenant: String,
    pub career_url: String,
    pub status: DetectionStatus,
    pub strategy: Option<Strategy>,
    pub endpoint: Option<String>,
    pub pagination_param: String,
    pub page_size_param: String,
    pub default_page_size: u32,
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<DetectionMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_job_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_count_estimate: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

/// Endpoint configuration produced by a successful probe.
pub struct EndpointConfig {
    pub strategy: Strategy,
    pub endpoint: String,
    pub pagination_param: &'static str,
    pub page_size_param: &'static str,
    pub default_page_size: u32,
    pub confidence: Confidence,
    pub method: Option<DetectionMethod>,
}

impl DetectionResult {
    pub fn success(tenant: &str, career_url: &str, config: EndpointConfig) -> Self {
        Self {
            tenant: tenant.to_string(),
            career_url: career_url.to_string(),
            status: DetectionStatus::Success,
            strategy: Some(config.strategy),
            endpoint: Some(config.endpoint),
            pagination_param: config.pagination_param.to_string(),
            page_size_param: config.page_size_param.to_string(),
            default_page_size: config.default_page_size,
            confidence: Some(config.confidence),
            method: config.method,
            sample_job_ids: Vec::new(),
            job_count_estimate: None,
            error: None,
        }
    }

    /// `sample_job_ids` must be non-empty; total is the count of distinct
    /// ids seen on the page, of which at most 5 are carried as samples.
    pub fn partial(
        tenant: &str,
        career_url: &str,
        sample_job_ids: Vec<String>,
        total: usize,
    ) -> Self {
        assert!(!sample_job_ids.is_empty(), "partial result needs samples");
        Self {
            tenant: tenant.to_string(),
            career_url: career_url.to_string(),
            status: DetectionStatus::Partial,
            strategy: Some(Strategy::FallbackHtml),
            endpoint: Some(career_url.to_string()),
            pagination_param: String::new(),
            page_size_param: String::new(),
            default_page_size: 1,
            confidence: Some(Confidence::Low),
            method: None,
            sample_job_ids,
            job_count_estimate: Some(total),
            error: None,
        }
    }

    pub fn failed(tenant: &str, career_url: &str, error: ErrorKind) -> Self {
        Self {
            tenant: tenant.to_string(),
            career_url: career_url.to_string(),
            status: DetectionStatus::Failed,
            strategy: None,
            endpoint: None,
            pagination_param: String::new(),
            page_size_param: String::new(),
            default_page_size: 1,
            confidence: None,
            method: None,
            sample_job_ids: Vec::new(),
            job_count_estimate: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_orders_high_above_low() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn success_carries_endpoint_and_strategy() {
        let result = DetectionResult::success(
            "acme.example.net",
            "https://acme.example.net/careers",
            EndpointConfig {
                strategy: Strategy::ReportJson,
                endpoint: "https://acme.example.net/PublicReports/42/json".into(),
                pagination_param: "offset",
                page_size_param: "recordsPerPage",
                default_page_size: 1000,
                confidence: Confidence::High,
                method: None,
            },
        );
        assert_eq!(result.status, DetectionStatus::Success);
        assert!(result.endpoint.is_some());
        assert_eq!(result.strategy, Some(Strategy::ReportJson));
        assert!(result.error.is_none());
    }

    #[test]
    #[should_panic(expected = "partial result needs samples")]
    fn partial_rejects_empty_samples() {
        DetectionResult::partial("t", "https://t/careers", vec![], 0);
    }
}
