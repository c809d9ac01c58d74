use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::contest::{LeaderboardRow, Ranked};

pub const RESULT_FIELDS: [&str; 4] = ["user", "punts", "vali", "revi"];
pub const EXTENDED_RESULT_FIELDS: [&str; 7] = ["user", "punts", "vali", "revi", "revi2", "revi3", "revi5"];

/// A results-file row, including the secondary counters some contests track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    pub user: String,
    pub punts: i64,
    pub vali: i64,
    pub revi: i64,
    pub revi2: i64,
    pub revi3: i64,
    pub revi5: i64,
}

impl ResultRow {
    /// Add another row's counters into this one.
    pub fn absorb(&mut self, other: &ResultRow) {
        self.punts += other.punts;
        self.vali += other.vali;
        self.revi += other.revi;
        self.revi2 += other.revi2;
        self.revi3 += other.revi3;
        self.revi5 += other.revi5;
    }
}

impl Ranked for ResultRow {
    fn user(&self) -> &str {
        &self.user
    }

    fn rank_key(&self) -> (i64, i64, i64) {
        (self.punts, self.revi, self.vali)
    }
}

impl From<&LeaderboardRow> for ResultRow {
    fn from(row: &LeaderboardRow) -> Self {
        Self {
            user: row.user.clone(),
            punts: row.punts,
            vali: row.vali,
            revi: row.revi,
            ..Self::default()
        }
    }
}

/// Leaderboard as TSV with a `user punts vali revi` header.
pub fn format_results(rows: &[LeaderboardRow]) -> String {
    let mut out = RESULT_FIELDS.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&format!("{}\t{}\t{}\t{}\n", row.user, row.punts, row.vali, row.revi));
    }
    out
}

/// Rows as TSV with the extended header (secondary counters included).
pub fn format_extended_results(rows: &[ResultRow]) -> String {
    let mut out = EXTENDED_RESULT_FIELDS.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            row.user, row.punts, row.vali, row.revi, row.revi2, row.revi3, row.revi5
        ));
    }
    out
}

fn column(header: &[&str], name: &str) -> Option<usize> {
    header.iter().position(|field| field.trim() == name)
}

/// Parse a results TSV. Columns are located by header name; `revi2`,
/// `revi3` and `revi5` are optional and default to 0.
pub fn parse_results(content: &str) -> Result<Vec<ResultRow>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .context("Results file is empty")?
        .split('\t')
        .collect();

    let required = |name: &str| {
        column(&header, name).with_context(|| format!("Results header lacks a '{}' column", name))
    };
    let user_col = required("user")?;
    let punts_col = required("punts")?;
    let vali_col = required("vali")?;
    let revi_col = required("revi")?;
    let optional = [
        column(&header, "revi2"),
        column(&header, "revi3"),
        column(&header, "revi5"),
    ];

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        let number = |col: Option<usize>| -> Result<i64> {
            match col {
                None => Ok(0),
                Some(col) => {
                    let raw = fields.get(col).map(|f| f.trim()).unwrap_or("");
                    raw.parse::<i64>()
                        .with_context(|| format!("Line {}: '{}' is not an integer", lineno + 2, raw))
                }
            }
        };

        rows.push(ResultRow {
            user: fields
                .get(user_col)
                .map(|f| f.trim().to_string())
                .with_context(|| format!("Line {}: missing user", lineno + 2))?,
            punts: number(Some(punts_col))?,
            vali: number(Some(vali_col))?,
            revi: number(Some(revi_col))?,
            revi2: number(optional[0])?,
            revi3: number(optional[1])?,
            revi5: number(optional[2])?,
        });
    }
    Ok(rows)
}

pub fn read_results(path: &Path) -> Result<Vec<ResultRow>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file {}", path.display()))?;
    parse_results(&content).with_context(|| format!("Invalid results file {}", path.display()))
}

pub fn write_report(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaderboard() -> Vec<LeaderboardRow> {
        vec![
            LeaderboardRow { user: "carol".to_string(), punts: 7, vali: 0, revi: 1 },
            LeaderboardRow { user: "alice".to_string(), punts: 5, vali: 1, revi: 1 },
        ]
    }

    #[test]
    fn test_format_results() {
        assert_eq!(
            format_results(&leaderboard()),
            "user\tpunts\tvali\trevi\ncarol\t7\t0\t1\nalice\t5\t1\t1\n"
        );
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results(&[]), "user\tpunts\tvali\trevi\n");
    }

    #[test]
    fn test_parse_basic_results() {
        let rows = parse_results(&format_results(&leaderboard())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user, "carol");
        assert_eq!(rows[0].punts, 7);
        assert_eq!(rows[1].revi5, 0);
    }

    #[test]
    fn test_parse_extended_results() {
        let content = "user\tpunts\tvali\trevi\trevi2\trevi3\trevi5\nBob\t-3\t0\t-1\t1\t2\t3\n";
        let rows = parse_results(content).unwrap();
        assert_eq!(
            rows[0],
            ResultRow {
                user: "Bob".to_string(),
                punts: -3,
                vali: 0,
                revi: -1,
                revi2: 1,
                revi3: 2,
                revi5: 3,
            }
        );
    }

    #[test]
    fn test_parse_reordered_columns() {
        let rows = parse_results("punts\tuser\trevi\tvali\n4\tDan\t1\t0\n").unwrap();
        assert_eq!(rows[0].user, "Dan");
        assert_eq!(rows[0].punts, 4);
        assert_eq!(rows[0].revi, 1);
    }

    #[test]
    fn test_parse_rejects_bad_number() {
        let err = parse_results("user\tpunts\tvali\trevi\nBob\tmany\t0\t0\n").unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_parse_rejects_missing_column() {
        let err = parse_results("user\tpunts\tvali\nBob\t1\t0\n").unwrap_err();
        assert!(err.to_string().contains("'revi'"));
    }

    #[test]
    fn test_format_extended_results() {
        let rows = vec![ResultRow::from(&leaderboard()[0])];
        assert_eq!(
            format_extended_results(&rows),
            "user\tpunts\tvali\trevi\trevi2\trevi3\trevi5\ncarol\t7\t0\t1\t0\t0\t0\n"
        );
    }
}
