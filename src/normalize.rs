//! Raw JSON object / HTML element -> JobRecord. Pure functions, no network.
//!
//! Field resolution runs through explicit ordered alias lists so the
//! tie-break order stays auditable: the first present, non-null value wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use url::Url;

use crate::models::job::JobRecord;

const ID_FIELDS: &[&str] = &["id", "jobId", "Id", "requisitionId", "positionId"];
const TITLE_FIELDS: &[&str] = &["title", "jobTitle", "positionTitle", "name"];
const LOCATION_FIELDS: &[&str] = &["location", "primaryLocation", "city"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "summary", "jobDescription"];
const DATE_FIELDS: &[&str] = &["postedDate", "datePosted", "createdDate"];
const URL_FIELDS: &[&str] = &["url", "jobUrl", "applyUrl"];

/// Sub-object keys joined (in this order) when a location is structured.
const LOCATION_PARTS: &[&str] = &["city", "state", "country", "region"];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static JOB_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"/(\d{4,})", r"jobId=(\d+)", r"id=(\d+)"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static LOCATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:Location|City|Office)[\s:]+([^|;\n]+)").unwrap());

static PLACE_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(New York|London|Tokyo|Singapore|Hong Kong|US|UK|Remote)\b").unwrap()
});

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Collapse whitespace runs and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Pull a numeric job id out of a URL, trying the path-segment form first,
/// then the query-parameter forms.
pub fn extract_job_id_from_url(url: &str) -> Option<String> {
    JOB_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).map(|c| c[1].to_string()))
}

/// Resolve `href` against `base`, passing absolute URLs through.
pub fn join_url(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Coerce a JSON scalar to a non-empty string. Empty strings count as
/// absent, so an `""` title discards the record instead of emitting a
/// blank one, and an `""` URL falls through to synthesis.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_field<'a>(obj: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|f| obj.get(*f).filter(|v| !v.is_null()))
}

fn resolve_location(obj: &Value) -> Option<String> {
    let value = first_field(obj, LOCATION_FIELDS)?;
    if let Value::Object(map) = value {
        let parts: Vec<String> = LOCATION_PARTS
            .iter()
            .filter_map(|k| map.get(*k).and_then(stringify))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    } else {
        stringify(value)
    }
}

/// Title slug used when a job URL has to be synthesized: spaces to dashes,
/// everything outside [A-Za-z0-9-] stripped, capped at 50 chars.
fn slugify(title: &str) -> String {
    title
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(50)
        .collect()
}

fn resolve_url(obj: &Value, base_url: &str, title: &str, job_id: Option<&str>) -> Option<String> {
    if let Some(url) = first_field(obj, URL_FIELDS).and_then(stringify) {
        return Some(join_url(base_url, &url));
    }
    // No advertised URL: synthesize the conventional detail-page path,
    // which only works when the source exposes an id.
    job_id.map(|id| format!("{base_url}/JobDetail/{}/{id}", slugify(title)))
}

/// Normalize one JSON job object. Returns `None` when no title resolves;
/// such records are discarded, never emitted empty.
pub fn job_from_json(obj: &Value, tenant: &str, base_url: &str) -> Option<JobRecord> {
    let title = first_field(obj, TITLE_FIELDS).and_then(stringify)?;
    let job_id = first_field(obj, ID_FIELDS).and_then(stringify);

    let mut record = JobRecord::new(tenant, &title);
    record.job_url = resolve_url(obj, base_url, &title, job_id.as_deref());
    record.job_id = job_id;
    record.location = resolve_location(obj);
    record.job_description = first_field(obj, DESCRIPTION_FIELDS).and_then(stringify);
    record.date_posted = first_field(obj, DATE_FIELDS).and_then(stringify);
    Some(record)
}

/// Normalize one HTML listing element. The first anchor supplies title and
/// URL; no anchor (or an empty title) yields no record.
pub fn job_from_listing(element: ElementRef<'_>, base_url: &str, tenant: &str) -> Option<JobRecord> {
    // The listing element may itself be the anchor when discovery could
    // not lift it to a block-level parent.
    let anchor = if element.value().name() == "a" && element.value().attr("href").is_some() {
        element
    } else {
        element.select(&ANCHOR).next()?
    };

    let title = clean_text(&anchor.text().collect::<String>());
    if title.is_empty() {
        return None;
    }
    let href = anchor.value().attr("href")?;
    let job_url = join_url(base_url, href);

    let mut record = JobRecord::new(tenant, &title);
    record.job_id = extract_job_id_from_url(&job_url);
    record.job_url = Some(job_url);

    let element_text = element.text().collect::<String>();
    record.location = LOCATION_LABEL
        .captures(&element_text)
        .map(|c| clean_text(&c[1]))
        .or_else(|| PLACE_NAMES.captures(&element_text).map(|c| c[1].to_string()));

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;
    use serde_json::json;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Senior\n\t Engineer  "), "Senior Engineer");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn job_id_pattern_order() {
        assert_eq!(
            extract_job_id_from_url("https://t/JobDetail/eng/12345"),
            Some("12345".to_string())
        );
        assert_eq!(
            extract_job_id_from_url("https://t/detail?jobId=99"),
            Some("99".to_string())
        );
        assert_eq!(
            extract_job_id_from_url("https://t/detail?id=7"),
            Some("7".to_string())
        );
        assert_eq!(extract_job_id_from_url("https://t/careers"), None);
    }

    #[test]
    fn json_alias_order_first_wins() {
        let obj = json!({"jobTitle": "Alias", "title": "Primary", "id": 41, "requisitionId": "R-9"});
        let record = job_from_json(&obj, "t", "https://t").unwrap();
        assert_eq!(record.job_title, "Primary");
        assert_eq!(record.job_id.as_deref(), Some("41"));
    }

    #[test]
    fn json_without_title_is_discarded() {
        let obj = json!({"id": 1, "location": "Oslo"});
        assert!(job_from_json(&obj, "t", "https://t").is_none());
    }

    #[test]
    fn empty_string_fields_count_as_absent() {
        let obj = json!({"title": "", "id": 1});
        assert!(job_from_json(&obj, "t", "https://t").is_none());

        let obj = json!({"title": "Engineer", "id": 7, "location": "", "url": ""});
        let record = job_from_json(&obj, "t", "https://t").unwrap();
        assert_eq!(record.location, None);
        // Blank advertised URL falls through to the synthesized path.
        assert_eq!(
            record.job_url.as_deref(),
            Some("https://t/JobDetail/Engineer/7")
        );
    }

    #[test]
    fn structured_location_joins_parts_in_order() {
        let obj = json!({
            "title": "Analyst",
            "location": {"country": "UK", "city": "London"}
        });
        let record = job_from_json(&obj, "t", "https://t").unwrap();
        assert_eq!(record.location.as_deref(), Some("London, UK"));
    }

    #[test]
    fn plain_location_is_stringified() {
        let obj = json!({"title": "Analyst", "primaryLocation": "Tokyo"});
        let record = job_from_json(&obj, "t", "https://t").unwrap();
        assert_eq!(record.location.as_deref(), Some("Tokyo"));
    }

    #[test]
    fn url_synthesized_from_slug_and_id() {
        let obj = json!({"title": "Staff Engineer (ML)", "id": 777});
        let record = job_from_json(&obj, "t", "https://t.example.net").unwrap();
        assert_eq!(
            record.job_url.as_deref(),
            Some("https://t.example.net/JobDetail/Staff-Engineer-ML/777")
        );
    }

    #[test]
    fn advertised_url_beats_synthesis_and_relative_is_joined() {
        let obj = json!({"title": "X", "id": 1, "url": "/jobs/1"});
        let record = job_from_json(&obj, "t", "https://t.example.net").unwrap();
        assert_eq!(record.job_url.as_deref(), Some("https://t.example.net/jobs/1"));
    }

    #[test]
    fn no_id_and_no_url_field_leaves_url_unset() {
        let obj = json!({"title": "X"});
        let record = job_from_json(&obj, "t", "https://t.example.net").unwrap();
        assert!(record.job_url.is_none());
        assert!(record.job_id.is_none());
    }

    #[test]
    fn normalizing_twice_is_identical_except_scraped_at() {
        let obj = json!({
            "title": "Engineer",
            "jobId": 1234,
            "location": {"city": "Singapore", "region": "APAC"},
            "description": "Build things",
            "postedDate": "2026-08-01"
        });
        let a = job_from_json(&obj, "t", "https://t").unwrap();
        let b = job_from_json(&obj, "t", "https://t").unwrap();
        assert_eq!(a.job_title, b.job_title);
        assert_eq!(a.job_id, b.job_id);
        assert_eq!(a.job_url, b.job_url);
        assert_eq!(a.location, b.location);
        assert_eq!(a.job_description, b.job_description);
        assert_eq!(a.date_posted, b.date_posted);
    }

    fn first_listing_element(html: &str) -> JobRecord {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("li").unwrap();
        let element = doc.select(&sel).next().unwrap();
        job_from_listing(element, "https://t.example.net/careers/SearchJobs", "t").unwrap()
    }

    #[test]
    fn listing_anchor_supplies_title_url_and_id() {
        let record = first_listing_element(
            r#"<li><a href="/careers/JobDetail/welder/20001">  Welder  II </a></li>"#,
        );
        assert_eq!(record.job_title, "Welder II");
        assert_eq!(
            record.job_url.as_deref(),
            Some("https://t.example.net/careers/JobDetail/welder/20001")
        );
        assert_eq!(record.job_id.as_deref(), Some("20001"));
    }

    #[test]
    fn listing_location_label_beats_place_names() {
        let record = first_listing_element(
            r#"<li><a href="/JobDetail/x/10001">X</a><span>Location: Hamburg | Full time</span> London</li>"#,
        );
        assert_eq!(record.location.as_deref(), Some("Hamburg"));
    }

    #[test]
    fn listing_falls_back_to_place_name_match() {
        let record = first_listing_element(
            r#"<li><a href="/JobDetail/x/10001">X</a><span>Hong Kong office</span></li>"#,
        );
        assert_eq!(record.location.as_deref(), Some("Hong Kong"));
    }

    #[test]
    fn listing_without_anchor_yields_nothing() {
        let doc = Html::parse_fragment("<li>No link here</li>");
        let sel = Selector::parse("li").unwrap();
        let element = doc.select(&sel).next().unwrap();
        assert!(job_from_listing(element, "https://t", "t").is_none());
    }
}
