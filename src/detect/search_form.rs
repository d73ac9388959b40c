use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::detect::{CareerPage, EndpointProbe};
use crate::fetch::Fetcher;
use crate::models::detection::{
    Confidence, DetectionMethod, DetectionResult, EndpointConfig, Strategy,
};
use crate::normalize::join_url;

static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form[action]").unwrap());

/// Conventional SearchJobs locations, tried when the keyword appears in
/// the markup but no form does.
const COMMON_PATHS: &[&str] = &["/careers/SearchJobs/", "/careers/SearchJobs", "/SearchJobs/"];

/// Looks for the SearchJobs HTML search form, falling back to guessing
/// conventional paths with one HEAD check per candidate.
pub struct SearchFormProbe;

/// Action of the first form pointing at SearchJobs. Sync so the parsed
/// document never crosses an await point.
fn search_form_action(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&FORM).find_map(|form| {
        let action = form.value().attr("action")?;
        action
            .to_ascii_lowercase()
            .contains("searchjobs")
            .then(|| action.to_string())
    })
}

#[async_trait]
impl EndpointProbe for SearchFormProbe {
    fn name(&self) -> &'static str {
        "search_jobs"
    }

    async fn probe(&self, page: &CareerPage, fetcher: &dyn Fetcher) -> Option<DetectionResult> {
        let base_url = format!("https://{}", page.tenant);

        if let Some(action) = search_form_action(&page.html) {
            // A real form is trusted without a test call.
            return Some(self.config(page, join_url(&base_url, &action), DetectionMethod::FormDetection));
        }

        if !page.html.contains("SearchJobs") {
            return None;
        }

        for path in COMMON_PATHS {
            let candidate = format!("{base_url}{path}");
            match fetcher.head(&candidate).await {
                Ok(200) => {
                    return Some(self.config(page, candidate, DetectionMethod::PathGuessing));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("{}: HEAD {candidate} failed: {e}", page.tenant);
                }
            }
        }

        None
    }
}

impl SearchFormProbe {
    fn config(
        &self,
        page: &CareerPage,
        endpoint: String,
        method: DetectionMethod,
    ) -> DetectionResult {
        DetectionResult::success(
            &page.tenant,
            &page.url,
            EndpointConfig {
                strategy: Strategy::SearchFormHtml,
                endpoint,
                pagination_param: "jobOffset",
                page_size_param: "jobRecords",
                default_page_size: 50,
                confidence: Confidence::Medium,
                method: Some(method),
            },
        )
    }
}
