use regex::Regex;

use super::schema::Config;
use crate::telemetry::parse_level;

/// Validate the configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Err(e) = config.window() {
        errors.push(format!("contest: {}", e));
    }

    if config.contest.language.trim().is_empty() {
        errors.push("contest.language: must not be empty".to_string());
    }

    if let Some(ref pattern) = config.contest.book_regex {
        match Regex::new(pattern) {
            Ok(re) if re.captures_len() < 3 => errors.push(format!(
                "contest.book_regex: '{}' needs two capture groups (title, extension)",
                pattern
            )),
            Ok(_) => {}
            Err(e) => errors.push(format!("contest.book_regex: invalid '{}' - {}", pattern, e)),
        }
    }

    for (field, value) in [
        ("fetch.retry_delay", &config.fetch.retry_delay),
        ("fetch.timeout", &config.fetch.timeout),
    ] {
        if let Some(value) = value {
            if let Err(e) = humantime::parse_duration(value) {
                errors.push(format!("{}: invalid duration '{}' - {}", field, value, e));
            }
        }
    }

    if config.fetch.concurrency == Some(0) {
        errors.push("fetch.concurrency: must be at least 1".to_string());
    }

    if config.fetch.max_retries == Some(0) {
        errors.push("fetch.max_retries: must be at least 1".to_string());
    }

    if config.fetch.rvlimit == Some(0) {
        errors.push("fetch.rvlimit: must be at least 1".to_string());
    }

    if let Some(ref level) = config.log_level {
        if parse_level(level).is_none() {
            errors.push(format!(
                "log_level: unknown level '{}' (error, warn, info, debug, trace)",
                level
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
