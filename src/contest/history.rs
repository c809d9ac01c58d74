use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::quality::{extract_quality, ExtractionError, QualityLevel};

/// Timestamp format used by the MediaWiki API.
pub const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A page revision as delivered by a revision source.
///
/// Field names follow the MediaWiki `prop=revisions` response so cached API
/// payloads deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRevision {
    /// Revision id; orders revisions saved within the same second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revid: Option<u64>,
    #[serde(default)]
    pub user: String,
    pub timestamp: String,
    #[serde(rename = "*", default)]
    pub content: String,
}

/// One extracted revision of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub level: QualityLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Upstream contract violation; never downgraded to a page skip.
    #[error("malformed revision timestamp '{0}'")]
    Timestamp(String),
    #[error("revision by '{user}' at {timestamp}: {source}")]
    Extraction {
        user: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: ExtractionError,
    },
}

impl HistoryError {
    /// Whether the error only invalidates the page it was found on.
    pub fn skips_page(&self) -> bool {
        matches!(self, HistoryError::Extraction { .. })
    }
}

/// Revisions of a single page, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHistory {
    revisions: Vec<Revision>,
}

impl PageHistory {
    /// Build a history from already-extracted revisions, sorting them
    /// chronologically. Revisions sharing a timestamp keep their input order.
    pub fn from_revisions(mut revisions: Vec<Revision>) -> Self {
        revisions.sort_by_key(|rev| rev.timestamp);
        Self { revisions }
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.revisions.iter()
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }
}

impl<'a> IntoIterator for &'a PageHistory {
    type Item = &'a Revision;
    type IntoIter = std::slice::Iter<'a, Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}

/// Parse a MediaWiki API timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
pub fn parse_api_timestamp(value: &str) -> Result<DateTime<Utc>, HistoryError> {
    NaiveDateTime::parse_from_str(value, API_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| HistoryError::Timestamp(value.to_string()))
}

/// Turn the raw revisions of a page into a chronological [`PageHistory`].
///
/// `None` means the source knows no such page: the history is empty.
/// Revisions are ordered by timestamp, then by revision id. Sources deliver
/// revisions newest first (the API's order, kept by the cache), so entries
/// that tie on both keys are replayed in reverse source order.
///
/// Timestamps are checked for every revision before any text is parsed, so
/// a malformed timestamp is always reported even on pages that would be
/// skipped for a missing quality marker.
pub fn normalize(raw: Option<Vec<RawRevision>>) -> Result<PageHistory, HistoryError> {
    let Some(mut raw) = raw else {
        return Ok(PageHistory::default());
    };
    raw.reverse();

    let mut timed = raw
        .into_iter()
        .map(|rev| parse_api_timestamp(&rev.timestamp).map(|timestamp| (timestamp, rev)))
        .collect::<Result<Vec<_>, _>>()?;
    timed.sort_by_key(|(timestamp, rev)| (*timestamp, rev.revid));

    let revisions = timed
        .into_iter()
        .map(|(timestamp, rev)| {
            let level = extract_quality(&rev.content).map_err(|source| HistoryError::Extraction {
                user: rev.user.clone(),
                timestamp,
                source,
            })?;
            Ok(Revision {
                timestamp,
                user: rev.user,
                level,
            })
        })
        .collect::<Result<Vec<_>, HistoryError>>()?;

    Ok(PageHistory::from_revisions(revisions))
}
