use chrono::{DateTime, Utc};
use serde::Serialize;

/// One normalized job posting, ready for the output sink.
///
/// `job_id` is optional because some sources never expose a stable id;
/// id-less records cannot be deduplicated and are always treated as new.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub tenant: String,
    pub job_id: Option<String>,
    pub job_title: String,
    pub job_url: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
    pub job_description: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// A record with only the required fields set; normalizers fill in the
    /// rest from whatever the source exposes.
    pub fn new(tenant: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            job_id: None,
            job_title: title.into(),
            job_url: None,
            location: None,
            date_posted: None,
            job_description: None,
            scraped_at: Utc::now(),
        }
    }
}
