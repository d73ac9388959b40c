use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::detect::{CareerPage, EndpointProbe};
use crate::fetch::Fetcher;
use crate::models::detection::DetectionResult;

/// Job-id shapes seen in this platform's markup: query-parameter style,
/// data-attribute style, detail-path style.
static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"jobId[=:](\d+)",
        r#"data-job-id["\s]*=["\s]*(\d+)"#,
        r"/JobDetail/[^/]+/(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const MAX_SAMPLES: usize = 5;

/// Last resort: no usable endpoint, but the raw markup still leaks job
/// ids. Produces a Partial result whose samples feed the detail-page
/// crawl.
pub struct FallbackScrapeProbe;

#[async_trait]
impl EndpointProbe for FallbackScrapeProbe {
    fn name(&self) -> &'static str {
        "html_scrape"
    }

    async fn probe(&self, page: &CareerPage, _fetcher: &dyn Fetcher) -> Option<DetectionResult> {
        let ids: BTreeSet<String> = ID_PATTERNS
            .iter()
            .flat_map(|re| re.captures_iter(&page.html))
            .map(|c| c[1].to_string())
            .collect();

        if ids.is_empty() {
            return None;
        }

        let total = ids.len();
        let samples: Vec<String> = ids.into_iter().take(MAX_SAMPLES).collect();
        Some(DetectionResult::partial(
            &page.tenant,
            &page.url,
            samples,
            total,
        ))
    }
}
