use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::contest::{ContestWindow, WindowError};

pub const DEFAULT_MAX_RETRIES: usize = 10;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_RVLIMIT: u32 = 50;

/// Contest configuration file.
///
/// Example YAML:
/// ```yaml
/// contest:
///   start_date: "2024-11-01 00:00:00"
///   end_date: "2024-11-16 00:00:00"
///   language: it
/// fetch:
///   retry_delay: 500ms
/// log_level: info
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub contest: ContestConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Default log level when no -v/-d flag is given (error, warn, info, debug, trace)
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContestConfig {
    /// Contest start, "YYYY-MM-DD HH:MM:SS" (UTC)
    pub start_date: String,

    /// Contest end, "YYYY-MM-DD HH:MM:SS" (UTC)
    pub end_date: String,

    /// Wikisource language subdomain, e.g. "it"
    pub language: String,

    /// Page listing the contest books (extract-books only)
    #[serde(default)]
    pub rules_page: Option<String>,

    /// Regex with two groups, title and extension, matching a book on the rules page
    #[serde(default)]
    pub book_regex: Option<String>,
}

/// Revision fetching parameters. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Attempts per API request before giving up (default: 10)
    #[serde(default)]
    pub max_retries: Option<usize>,

    /// Fixed pause between attempts, humantime format (default: "500ms")
    #[serde(default)]
    pub retry_delay: Option<String>,

    /// Per-request HTTP timeout, humantime format (default: "30s")
    #[serde(default)]
    pub timeout: Option<String>,

    /// Pages of a book fetched concurrently (default: 8)
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Revisions requested per page (default: 50)
    #[serde(default)]
    pub rvlimit: Option<u32>,
}

impl Config {
    pub fn window(&self) -> Result<ContestWindow, WindowError> {
        ContestWindow::parse(&self.contest.start_date, &self.contest.end_date)
    }
}

impl FetchConfig {
    pub fn max_retries(&self) -> usize {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn retry_delay(&self) -> Duration {
        parse_duration_or(self.retry_delay.as_deref(), DEFAULT_RETRY_DELAY)
    }

    pub fn timeout(&self) -> Duration {
        parse_duration_or(self.timeout.as_deref(), DEFAULT_TIMEOUT)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }

    pub fn rvlimit(&self) -> u32 {
        self.rvlimit.unwrap_or(DEFAULT_RVLIMIT)
    }
}

// Invalid strings are reported by validate_config before they get here.
fn parse_duration_or(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| humantime::parse_duration(v).ok())
        .unwrap_or(default)
}
