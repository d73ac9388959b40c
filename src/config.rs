use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "jobscout",
    about = "Career-site job scraper with automatic endpoint detection"
)]
pub struct Config {
    /// File with one career-page URL per line ('#' starts a comment)
    #[arg(long, env = "SITES_FILE", default_value = "sites.txt")]
    pub sites: String,

    /// Output path for JSON results
    #[arg(long, short, env = "OUTPUT_FILE", default_value = "jobs.json")]
    pub output: String,

    /// Requests per second against one tenant
    #[arg(long, env = "RATE_LIMIT", default_value = "1.0")]
    pub requests_per_second: f64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "15")]
    pub timeout: u64,

    /// Attempts per request (retries cover timeouts only)
    #[arg(long, env = "MAX_RETRIES", default_value = "2")]
    pub max_retries: u32,

    /// Hard cap on pages fetched per site
    #[arg(long, env = "MAX_PAGES", default_value = "20")]
    pub max_pages: u32,

    /// Same-page duplicate fraction above which pagination is declared broken
    #[arg(long, default_value = "0.8")]
    pub duplicate_threshold: f64,

    /// Consecutive pages without new records before stopping
    #[arg(long, default_value = "2")]
    pub max_empty_pages: u32,

    /// Minimum randomized delay between page fetches, seconds
    #[arg(long, default_value = "2.0")]
    pub delay_min: f64,

    /// Maximum randomized delay between page fetches, seconds
    #[arg(long, default_value = "4.0")]
    pub delay_max: f64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Probe each site and report the detected endpoint configuration
    Detect,
    /// Detect and extract job postings (default when no subcommand given)
    Scrape,
}

impl Config {
    /// Resolve the command, defaulting to Scrape if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Scrape)
    }

    /// Validate the numeric knobs before anything downstream consumes
    /// them; a bad flag should fail at startup, not mid-run.
    pub fn settings(&self) -> anyhow::Result<ScrapeSettings> {
        anyhow::ensure!(
            self.requests_per_second > 0.0 && self.requests_per_second.is_finite(),
            "--requests-per-second must be a positive number, got {}",
            self.requests_per_second
        );
        anyhow::ensure!(
            self.delay_min >= 0.0,
            "--delay-min must not be negative, got {}",
            self.delay_min
        );
        anyhow::ensure!(
            self.delay_max >= self.delay_min,
            "--delay-max ({}) must be at least --delay-min ({})",
            self.delay_max,
            self.delay_min
        );
        anyhow::ensure!(
            self.duplicate_threshold > 0.0 && self.duplicate_threshold <= 1.0,
            "--duplicate-threshold must be a fraction in (0, 1], got {}",
            self.duplicate_threshold
        );
        Ok(ScrapeSettings {
            requests_per_second: self.requests_per_second,
            timeout_secs: self.timeout,
            max_retries: self.max_retries,
            max_pages: self.max_pages,
            duplicate_threshold: self.duplicate_threshold,
            max_empty_pages: self.max_empty_pages,
            page_delay_secs: (self.delay_min, self.delay_max),
        })
    }
}

/// Knobs for one extraction run. The thresholds are empirical and
/// site-dependent, so they stay configurable rather than hard-coded; the
/// defaults are the values that held up in production.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub requests_per_second: f64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_pages: u32,
    pub duplicate_threshold: f64,
    pub max_empty_pages: u32,
    /// Uniform range for the jittered pause between page fetches, applied
    /// on top of the rate limiter to break up burst patterns.
    pub page_delay_secs: (f64, f64),
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 1.0,
            timeout_secs: 15,
            max_retries: 2,
            max_pages: 20,
            duplicate_threshold: 0.8,
            max_empty_pages: 2,
            page_delay_secs: (2.0, 4.0),
        }
    }
}

#[cfg(test)]
impl ScrapeSettings {
    /// Defaults without the inter-page pause, for fast tests.
    pub fn without_delay() -> Self {
        Self {
            page_delay_secs: (0.0, 0.0),
            ..Self::default()
        }
    }
}
