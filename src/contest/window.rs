use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Format of `start_date` / `end_date` in the contest configuration.
pub const CONFIG_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid {field} '{value}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidDate { field: &'static str, value: String },
    #[error("contest ends ({end}) before it starts ({start})")]
    EndsBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Contest time window.
///
/// Forward scoring events count when they land in `[start, end)`. A revert
/// only claws points back when the reverted revision landed in
/// `[start, end]`, whenever the revert itself happens (as long as it is
/// not before `start`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ContestWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::EndsBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a window from the configuration's `YYYY-MM-DD HH:MM:SS` strings (UTC).
    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        let start = parse_config_date("start_date", start)?;
        let end = parse_config_date("end_date", end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Gate for forward awards: `start <= t < end`.
    pub fn is_open_at(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    /// Gate for the reverted revision: `start <= t <= end`.
    pub fn covers(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Gate for the reverting revision: no upper bound.
    pub fn has_started_by(&self, t: DateTime<Utc>) -> bool {
        t >= self.start
    }
}

fn parse_config_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, WindowError> {
    NaiveDateTime::parse_from_str(value.trim(), CONFIG_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| WindowError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_config_dates() {
        let window = ContestWindow::parse("2024-11-01 00:00:00", "2024-11-15 23:59:59").unwrap();
        assert_eq!(window.start(), at(0));
        assert_eq!(
            window.end(),
            Utc.with_ymd_and_hms(2024, 11, 15, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let err = ContestWindow::parse("2024-11-01", "2024-11-15 00:00:00").unwrap_err();
        assert!(matches!(err, WindowError::InvalidDate { field: "start_date", .. }));
    }

    #[test]
    fn test_rejects_reversed_window() {
        assert!(ContestWindow::new(at(10), at(9)).is_err());
        assert!(ContestWindow::new(at(10), at(10)).is_ok());
    }

    #[test]
    fn test_gates_at_boundaries() {
        let window = ContestWindow::new(at(1), at(5)).unwrap();

        assert!(!window.is_open_at(at(0)));
        assert!(window.is_open_at(at(1)));
        assert!(!window.is_open_at(at(5)));

        assert!(window.covers(at(1)));
        assert!(window.covers(at(5)));
        assert!(!window.covers(at(6)));

        assert!(!window.has_started_by(at(0)));
        assert!(window.has_started_by(at(23)));
    }
}
