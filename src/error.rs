use serde::Serializer;
use thiserror::Error;

/// Transport-level failures from the fetch client.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt timed out.
    #[error("timeout fetching {url} after {attempts} attempts")]
    Timeout { url: String, attempts: u32 },

    /// Non-timeout transport error; never retried.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failures inside one extraction run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Response body did not parse as the expected JSON/HTML shape.
    #[error("failed to parse page: {reason}")]
    Parse { reason: String },
}

impl ScrapeError {
    pub fn parse(reason: impl Into<String>) -> Self {
        ScrapeError::Parse {
            reason: reason.into(),
        }
    }

    /// The reporting category a per-tenant failure falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Fetch(_) => ErrorKind::FetchFailed,
            ScrapeError::Parse { .. } => ErrorKind::ParseFailure,
        }
    }
}

/// Error category recorded on a failed tenant, serialized as a snake_case
/// token (`fetch_failed`, `http_403`, ...) in detection output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport exhausted its retries, or failed outright.
    FetchFailed,
    /// The initial detection fetch returned a non-200 status.
    Http(u16),
    /// All probes ran and none matched.
    NoPatternDetected,
    /// A detail page redirected to a login surface.
    AuthRequired,
    /// The first page of a run did not parse.
    ParseFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::FetchFailed => write!(f, "fetch_failed"),
            ErrorKind::Http(code) => write!(f, "http_{code}"),
            ErrorKind::NoPatternDetected => write!(f, "no_pattern_detected"),
            ErrorKind::AuthRequired => write!(f, "auth_required"),
            ErrorKind::ParseFailure => write!(f, "parse_failure"),
        }
    }
}

impl serde::Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
