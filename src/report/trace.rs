use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::contest::{ContestWindow, PageHistory, Revision};

pub const TRACE_FIELDS: [&str; 7] = [
    "user",
    "existing_user",
    "quality",
    "old_user",
    "old_quality",
    "timestamp",
    "page",
];

/// How a revision's author relates to the page, for auditing results.
///
/// `C`/`D`: the user edited the page more than once (revision inside/outside
/// the window). `P`/`N`: the user's only edit (inside/outside the window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKind {
    RepeatInWindow,
    RepeatOutsideWindow,
    SingleInWindow,
    SingleOutsideWindow,
}

impl AuthorKind {
    pub fn code(self) -> char {
        match self {
            AuthorKind::RepeatInWindow => 'C',
            AuthorKind::RepeatOutsideWindow => 'D',
            AuthorKind::SingleInWindow => 'P',
            AuthorKind::SingleOutsideWindow => 'N',
        }
    }
}

/// One revision of a page as written to the debug trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRow {
    pub user: String,
    pub author: AuthorKind,
    pub quality: u8,
    pub old_user: Option<String>,
    /// 0 when the page had no earlier revision
    pub old_quality: u8,
    pub timestamp: DateTime<Utc>,
    pub page: u32,
}

pub fn trace_page(history: &PageHistory, page: u32, window: &ContestWindow) -> Vec<TraceRow> {
    let mut edits: HashMap<&str, usize> = HashMap::new();
    for rev in history {
        *edits.entry(rev.user.as_str()).or_default() += 1;
    }

    let mut rows = Vec::with_capacity(history.len());
    let mut previous: Option<&Revision> = None;
    for rev in history {
        let repeat = edits.get(rev.user.as_str()).copied().unwrap_or(0) > 1;
        let in_window = window.is_open_at(rev.timestamp);
        let author = match (repeat, in_window) {
            (true, true) => AuthorKind::RepeatInWindow,
            (true, false) => AuthorKind::RepeatOutsideWindow,
            (false, true) => AuthorKind::SingleInWindow,
            (false, false) => AuthorKind::SingleOutsideWindow,
        };

        rows.push(TraceRow {
            user: rev.user.clone(),
            author,
            quality: rev.level.level(),
            old_user: previous.map(|p| p.user.clone()),
            old_quality: previous.map(|p| p.level.level()).unwrap_or(0),
            timestamp: rev.timestamp,
            page,
        });
        previous = Some(rev);
    }
    rows
}

pub fn format_trace(rows: &[TraceRow]) -> String {
    let mut out = TRACE_FIELDS.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{:<25}\t{}\t{}\t{:<25}\t{}\t{}\t{}\n",
            row.user,
            row.author.code(),
            row.quality,
            row.old_user.as_deref().unwrap_or(""),
            row.old_quality,
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.page
        ));
    }
    out
}

/// `{dir}/{book}.revisions.tsv`
pub fn trace_path(dir: &Path, book: &str) -> PathBuf {
    dir.join(format!("{}.revisions.tsv", book.replace('/', "_")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::QualityLevel;
    use chrono::TimeZone;

    fn rev(user: &str, day: u32, level: QualityLevel) -> Revision {
        Revision {
            timestamp: Utc.with_ymd_and_hms(2024, 11, day, 12, 0, 0).unwrap(),
            user: user.to_string(),
            level,
        }
    }

    fn window() -> ContestWindow {
        ContestWindow::parse("2024-11-05 00:00:00", "2024-11-20 00:00:00").unwrap()
    }

    #[test]
    fn test_trace_page() {
        let history = PageHistory::from_revisions(vec![
            rev("Alice", 1, QualityLevel::Partial),
            rev("Bob", 6, QualityLevel::Proofread),
            rev("Alice", 7, QualityLevel::Validated),
            rev("Carol", 25, QualityLevel::Proofread),
        ]);
        let rows = trace_page(&history, 3, &window());

        let codes: Vec<char> = rows.iter().map(|r| r.author.code()).collect();
        assert_eq!(codes, vec!['D', 'P', 'C', 'N']);
        assert_eq!(rows[0].old_user, None);
        assert_eq!(rows[0].old_quality, 0);
        assert_eq!(rows[2].old_user.as_deref(), Some("Bob"));
        assert_eq!(rows[2].old_quality, 3);
        assert!(rows.iter().all(|r| r.page == 3));
    }

    #[test]
    fn test_format_trace() {
        let history = PageHistory::from_revisions(vec![rev("Alice", 6, QualityLevel::Proofread)]);
        let out = format_trace(&trace_page(&history, 1, &window()));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], TRACE_FIELDS.join("\t"));
        assert!(lines[1].starts_with("Alice"));
        assert!(lines[1].contains("\tP\t3\t"));
        assert!(lines[1].ends_with("\t2024-11-06 12:00:00\t1"));
    }

    #[test]
    fn test_trace_path_flattens_slashes() {
        assert_eq!(
            trace_path(Path::new("debug"), "Foo/Bar.djvu"),
            PathBuf::from("debug/Foo_Bar.djvu.revisions.tsv")
        );
    }
}
