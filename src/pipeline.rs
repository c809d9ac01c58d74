use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::books::Document;
use crate::contest::{normalize, score_page, ContestWindow, HistoryError, ScoreDelta};
use crate::report::{format_trace, trace_page, trace_path, TraceRow};
use crate::source::RevisionSource;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pages of a document fetched at the same time
    pub concurrency: usize,
    /// Write per-book revision traces into this directory
    pub trace_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            trace_dir: None,
        }
    }
}

/// A page left out of the tally because its history could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    pub book: String,
    pub page: u32,
    pub reason: String,
}

/// A document left out of the tally because its pages could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub book: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("page {page}: {error:#}")]
    Fetch { page: u32, error: anyhow::Error },
    #[error("page {page}: {error}")]
    History {
        page: u32,
        #[source]
        error: HistoryError,
    },
}

/// Result of scoring every page of one document.
#[derive(Debug, Default)]
pub struct DocumentScore {
    pub delta: ScoreDelta,
    pub skipped: Vec<SkippedPage>,
    /// Revision traces ordered by page, when requested
    pub trace: Vec<TraceRow>,
}

/// Contest totals plus what had to be left out to get them.
#[derive(Debug, Default)]
pub struct ContestTally {
    pub totals: ScoreDelta,
    pub per_document: Vec<(String, ScoreDelta)>,
    pub skipped_pages: Vec<SkippedPage>,
    pub failed_documents: Vec<FailedDocument>,
}

impl ContestTally {
    /// True when there were documents to score and none could be fetched.
    pub fn all_failed(&self) -> bool {
        self.per_document.is_empty() && !self.failed_documents.is_empty()
    }
}

enum PageOutcome {
    Scored {
        delta: ScoreDelta,
        trace: Option<Vec<TraceRow>>,
    },
    Skipped {
        page: u32,
        reason: String,
    },
}

async fn score_one_page<S: RevisionSource>(
    source: &S,
    book: &str,
    page: u32,
    window: &ContestWindow,
    with_trace: bool,
) -> Result<PageOutcome, DocumentError> {
    let raw = source
        .fetch_revisions(book, page)
        .await
        .map_err(|error| DocumentError::Fetch { page, error })?;

    let history = match normalize(raw) {
        Ok(history) => history,
        Err(e) if e.skips_page() => {
            return Ok(PageOutcome::Skipped {
                page,
                reason: e.to_string(),
            })
        }
        Err(error) => return Err(DocumentError::History { page, error }),
    };

    let trace = with_trace.then(|| trace_page(&history, page, window));
    Ok(PageOutcome::Scored {
        delta: score_page(history, window),
        trace,
    })
}

/// Score pages 1..=page_count of `document`, at most `concurrency` at a time.
///
/// A page whose history cannot be extracted is skipped and reported. Any
/// other error stops launching further pages and is returned.
pub async fn score_document<S: RevisionSource>(
    source: &S,
    document: &Document,
    window: &ContestWindow,
    concurrency: usize,
    with_trace: bool,
) -> Result<DocumentScore, DocumentError> {
    let mut pages = 1..=document.page_count;
    let mut in_flight = FuturesUnordered::new();
    for page in pages.by_ref().take(concurrency.max(1)) {
        in_flight.push(score_one_page(source, &document.id, page, window, with_trace));
    }

    let mut result = DocumentScore::default();
    while let Some(outcome) = in_flight.next().await {
        match outcome? {
            PageOutcome::Scored { delta, trace } => {
                result.delta.merge(delta);
                if let Some(rows) = trace {
                    result.trace.extend(rows);
                }
            }
            PageOutcome::Skipped { page, reason } => {
                tracing::warn!("Skipping {} page {}: {}", document.id, page, reason);
                result.skipped.push(SkippedPage {
                    book: document.id.clone(),
                    page,
                    reason,
                });
            }
        }

        if let Some(page) = pages.next() {
            in_flight.push(score_one_page(source, &document.id, page, window, with_trace));
        }
    }

    result.skipped.sort_by_key(|skipped| skipped.page);
    result.trace.sort_by_key(|row| row.page);
    Ok(result)
}

/// Score every document and fold the results into contest totals.
///
/// Documents are scored one after another, in the given order. A document
/// whose pages cannot be fetched is reported and left out; a malformed
/// revision timestamp aborts the run.
pub async fn score_contest<S: RevisionSource>(
    source: &S,
    documents: &[Document],
    window: &ContestWindow,
    options: &PipelineOptions,
) -> Result<ContestTally> {
    let mut tally = ContestTally::default();

    for (index, document) in documents.iter().enumerate() {
        tracing::info!(
            "[{}/{}] Scoring {} ({} pages)",
            index + 1,
            documents.len(),
            document.id,
            document.page_count
        );

        let outcome = score_document(
            source,
            document,
            window,
            options.concurrency,
            options.trace_dir.is_some(),
        )
        .await;

        match outcome {
            Ok(scored) => {
                if let Some(dir) = &options.trace_dir {
                    write_trace(dir, &document.id, &scored.trace)?;
                }
                tracing::debug!("{}: {} users credited", document.id, scored.delta.len());
                tally.totals.merge(scored.delta.clone());
                tally.per_document.push((document.id.clone(), scored.delta));
                tally.skipped_pages.extend(scored.skipped);
            }
            Err(e @ DocumentError::Fetch { .. }) => {
                tracing::error!("Skipping {}: {}", document.id, e);
                tally.failed_documents.push(FailedDocument {
                    book: document.id.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot score {}", document.id));
            }
        }

        source
            .checkpoint()
            .with_context(|| format!("Failed to save progress after {}", document.id))?;
    }

    Ok(tally)
}

fn write_trace(dir: &std::path::Path, book: &str, rows: &[TraceRow]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create trace directory {}", dir.display()))?;
    let path = trace_path(dir, book);
    fs::write(&path, format_trace(rows))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Wrote revision trace {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::{RawRevision, UserScore};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source: `(book, page)` -> revisions, or an error message.
    #[derive(Default)]
    struct MemorySource {
        pages: HashMap<(String, u32), Result<Vec<RawRevision>, String>>,
        checkpoints: AtomicUsize,
    }

    impl MemorySource {
        fn page(mut self, book: &str, page: u32, revisions: Vec<RawRevision>) -> Self {
            self.pages.insert((book.to_string(), page), Ok(revisions));
            self
        }

        fn failing(mut self, book: &str, page: u32) -> Self {
            self.pages
                .insert((book.to_string(), page), Err("connection reset".to_string()));
            self
        }
    }

    impl RevisionSource for MemorySource {
        async fn fetch_revisions(&self, book: &str, page: u32) -> Result<Option<Vec<RawRevision>>> {
            match self.pages.get(&(book.to_string(), page)) {
                None => Ok(None),
                Some(Ok(revisions)) => Ok(Some(revisions.clone())),
                Some(Err(message)) => Err(anyhow::anyhow!("{}", message)),
            }
        }

        fn checkpoint(&self) -> Result<()> {
            self.checkpoints.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn raw(user: &str, timestamp: &str, level: u8) -> RawRevision {
        RawRevision {
            revid: None,
            user: user.to_string(),
            timestamp: timestamp.to_string(),
            content: format!(
                "<noinclude><pagequality level=\"{}\" user=\"{}\" /></noinclude>text",
                level, user
            ),
        }
    }

    fn unmarked(user: &str, timestamp: &str) -> RawRevision {
        RawRevision {
            revid: None,
            user: user.to_string(),
            timestamp: timestamp.to_string(),
            content: "no marker here".to_string(),
        }
    }

    fn window() -> ContestWindow {
        ContestWindow::parse("2024-11-01 00:00:00", "2024-11-16 00:00:00").unwrap()
    }

    fn document(id: &str, page_count: u32) -> Document {
        Document {
            id: id.to_string(),
            page_count,
        }
    }

    #[tokio::test]
    async fn test_scores_pages_and_documents() {
        let source = MemorySource::default()
            .page("A.djvu", 1, vec![raw("Alice", "2024-11-02T10:00:00Z", 3)])
            .page(
                "A.djvu",
                2,
                vec![
                    raw("Bob", "2024-11-04T10:00:00Z", 4),
                    raw("Alice", "2024-11-03T10:00:00Z", 3),
                ],
            )
            .page("B.pdf", 1, vec![raw("Bob", "2024-11-05T10:00:00Z", 3)]);

        let tally = score_contest(
            &source,
            &[document("A.djvu", 2), document("B.pdf", 1)],
            &window(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(tally.totals.get("Alice"), UserScore::new(10, 0, 2));
        assert_eq!(tally.totals.get("Bob"), UserScore::new(6, 1, 1));
        assert_eq!(tally.per_document.len(), 2);
        assert_eq!(tally.per_document[0].0, "A.djvu");
        assert!(tally.skipped_pages.is_empty());
        assert_eq!(source.checkpoints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_only_that_page() {
        let source = MemorySource::default()
            .page(
                "A.djvu",
                1,
                vec![
                    raw("Alice", "2024-11-02T10:00:00Z", 3),
                    unmarked("Mallory", "2024-11-03T10:00:00Z"),
                ],
            )
            .page("A.djvu", 2, vec![raw("Bob", "2024-11-02T10:00:00Z", 3)])
            .page("A.djvu", 3, vec![raw("Carol", "2024-11-02T10:00:00Z", 3)]);

        let options = PipelineOptions {
            concurrency: 1,
            trace_dir: None,
        };
        let tally = score_contest(&source, &[document("A.djvu", 3)], &window(), &options)
            .await
            .unwrap();

        assert_eq!(tally.totals.get("Alice"), UserScore::default());
        assert_eq!(tally.totals.get("Bob"), UserScore::new(5, 0, 1));
        assert_eq!(tally.totals.get("Carol"), UserScore::new(5, 0, 1));
        assert_eq!(tally.skipped_pages.len(), 1);
        assert_eq!(tally.skipped_pages[0].page, 1);
        assert!(tally.skipped_pages[0].reason.contains("Mallory"));
    }

    #[tokio::test]
    async fn test_missing_pages_contribute_nothing() {
        let source = MemorySource::default();
        let tally = score_contest(
            &source,
            &[document("Empty.djvu", 4)],
            &window(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap();

        assert!(tally.totals.is_empty());
        assert!(tally.skipped_pages.is_empty());
        assert!(!tally.all_failed());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_document() {
        let source = MemorySource::default()
            .page("A.djvu", 1, vec![raw("Alice", "2024-11-02T10:00:00Z", 3)])
            .failing("A.djvu", 2)
            .page("B.pdf", 1, vec![raw("Bob", "2024-11-02T10:00:00Z", 3)]);

        let tally = score_contest(
            &source,
            &[document("A.djvu", 2), document("B.pdf", 1)],
            &window(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(tally.totals.get("Alice"), UserScore::default());
        assert_eq!(tally.totals.get("Bob"), UserScore::new(5, 0, 1));
        assert_eq!(tally.failed_documents.len(), 1);
        assert_eq!(tally.failed_documents[0].book, "A.djvu");
        assert!(tally.failed_documents[0].reason.contains("connection reset"));
        assert!(!tally.all_failed());
    }

    #[tokio::test]
    async fn test_all_documents_failed() {
        let source = MemorySource::default().failing("A.djvu", 1);
        let tally = score_contest(
            &source,
            &[document("A.djvu", 1)],
            &window(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap();
        assert!(tally.all_failed());
    }

    #[tokio::test]
    async fn test_malformed_timestamp_aborts() {
        let source = MemorySource::default()
            .page("A.djvu", 1, vec![raw("Alice", "yesterday", 3)])
            .page("B.pdf", 1, vec![raw("Bob", "2024-11-02T10:00:00Z", 3)]);

        let err = score_contest(
            &source,
            &[document("A.djvu", 1), document("B.pdf", 1)],
            &window(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(format!("{:#}", err).contains("yesterday"));
        assert_eq!(source.checkpoints.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_totals() {
        let mut source = MemorySource::default();
        for page in 1..=20 {
            let user = if page % 2 == 0 { "Alice" } else { "Bob" };
            source = source.page(
                "A.djvu",
                page,
                vec![
                    raw(user, "2024-11-02T10:00:00Z", 3),
                    raw("Carol", "2024-11-03T10:00:00Z", 4),
                ],
            );
        }

        let mut results = Vec::new();
        for concurrency in [1, 3, 20] {
            let options = PipelineOptions {
                concurrency,
                trace_dir: None,
            };
            let tally = score_contest(&source, &[document("A.djvu", 20)], &window(), &options)
                .await
                .unwrap();
            results.push(tally.totals);
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
        assert_eq!(results[0].get("Carol"), UserScore::new(20, 20, 0));
    }

    #[tokio::test]
    async fn test_writes_revision_traces() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default()
            .page("A.djvu", 2, vec![raw("Bob", "2024-11-02T10:00:00Z", 3)])
            .page("A.djvu", 1, vec![raw("Alice", "2024-11-02T10:00:00Z", 3)]);

        let options = PipelineOptions {
            concurrency: 2,
            trace_dir: Some(dir.path().to_path_buf()),
        };
        score_contest(&source, &[document("A.djvu", 2)], &window(), &options)
            .await
            .unwrap();

        let content = fs::read_to_string(dir.path().join("A.djvu.revisions.tsv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Alice"));
        assert!(lines[2].starts_with("Bob"));
    }
}
