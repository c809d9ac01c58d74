//! Combine the outputs of several `score` runs.
//!
//! Large contests are scored in slices (one books file per slice); the
//! per-slice result files are summed into one leaderboard, and their cache
//! files can be merged so a later full run replays everything.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::contest::rank_rows;
use crate::report::{read_results, ResultRow};
use crate::source::merge_cache_files;
use crate::storage::save_json;

/// Sum rows per user across result sets and rank the totals.
pub fn merge_rows<I>(parts: I) -> Vec<ResultRow>
where
    I: IntoIterator<Item = Vec<ResultRow>>,
{
    let mut by_user: BTreeMap<String, ResultRow> = BTreeMap::new();
    for rows in parts {
        for row in rows {
            by_user
                .entry(row.user.clone())
                .and_modify(|total| total.absorb(&row))
                .or_insert(row);
        }
    }
    rank_rows(by_user.into_values().collect())
}

/// Read and merge result files.
pub fn merge_result_files(files: &[PathBuf]) -> Result<Vec<ResultRow>> {
    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        let rows = read_results(file)?;
        tracing::info!("Read {} rows from {}", rows.len(), file.display());
        parts.push(rows);
    }
    Ok(merge_rows(parts))
}

/// Merge JSON cache files into `output`. Returns the number of top-level
/// entries written.
pub fn merge_caches(files: &[PathBuf], output: &Path) -> Result<usize> {
    let merged = merge_cache_files(files)?;
    save_json(output, &merged)?;
    tracing::info!("Wrote merged cache {} ({} entries)", output.display(), merged.len());
    Ok(merged.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, punts: i64, vali: i64, revi: i64) -> ResultRow {
        ResultRow {
            user: user.to_string(),
            punts,
            vali,
            revi,
            ..ResultRow::default()
        }
    }

    #[test]
    fn test_merge_rows_sums_per_user() {
        let merged = merge_rows(vec![
            vec![row("alice", 5, 1, 1), row("bob", 3, 0, 1)],
            vec![row("bob", 4, 1, 0), row("carol", 7, 0, 1)],
        ]);

        let users: Vec<&str> = merged.iter().map(|r| r.user.as_str()).collect();
        assert_eq!(users, vec!["bob", "carol", "alice"]);
        assert_eq!(merged[0], row("bob", 7, 1, 1));
    }

    #[test]
    fn test_merge_rows_keeps_secondary_counters() {
        let mut a = row("alice", 1, 0, 0);
        a.revi3 = 2;
        let mut b = row("alice", 1, 0, 0);
        b.revi3 = 1;
        b.revi5 = 4;

        let merged = merge_rows(vec![vec![a], vec![b]]);
        assert_eq!(merged[0].punts, 2);
        assert_eq!(merged[0].revi3, 3);
        assert_eq!(merged[0].revi5, 4);
    }

    #[test]
    fn test_merge_result_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.tsv");
        let second = dir.path().join("second.tsv");
        std::fs::write(&first, "user\tpunts\tvali\trevi\nalice\t5\t1\t1\nbob\t5\t1\t1\n").unwrap();
        std::fs::write(&second, "user\tpunts\tvali\trevi\ncarol\t7\t0\t1\n").unwrap();

        let merged = merge_result_files(&[first, second]).unwrap();
        let users: Vec<&str> = merged.iter().map(|r| r.user.as_str()).collect();
        assert_eq!(users, vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn test_merge_result_files_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(merge_result_files(&[dir.path().join("nope.tsv")]).is_err());
    }

    #[test]
    fn test_merge_caches() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let out = dir.path().join("out.json");
        std::fs::write(&a, r#"{"CACHE_BOOKS_LIST": {"Foo.djvu": 10}}"#).unwrap();
        std::fs::write(&b, r#"{"CACHE_BOOKS_LIST": {"Bar.pdf": 3}}"#).unwrap();

        assert_eq!(merge_caches(&[a, b], &out).unwrap(), 1);
        let merged: crate::books::BooklistCache =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(merged["CACHE_BOOKS_LIST"]["Foo.djvu"], 10);
        assert_eq!(merged["CACHE_BOOKS_LIST"]["Bar.pdf"], 3);
    }
}
