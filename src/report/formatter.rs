use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::contest::LeaderboardRow;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Truncate a username to fit its column, accounting for Unicode
fn truncate_user(user: &str, max_width: usize) -> String {
    let chars: Vec<char> = user.chars().collect();
    if chars.len() <= max_width {
        user.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format the leaderboard as a table: rank, user, punts, vali, revi.
/// Index column is right-aligned with a trailing dot ("  1.").
pub fn format_leaderboard(rows: &[LeaderboardRow], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No scoring events in the contest window.".to_string();
    }

    const USER_WIDTH: usize = 25;
    const NUMBER_WIDTH: usize = 6;

    let header = format!(
        "{:>4} {:<uw$} {:>nw$} {:>nw$} {:>nw$}",
        "#",
        "user",
        "punts",
        "vali",
        "revi",
        uw = USER_WIDTH,
        nw = NUMBER_WIDTH
    );

    let lines = rows.iter().enumerate().map(|(idx, row)| {
        let index_str = format!("{:>3}.", idx + 1);
        let user = format!("{:<width$}", truncate_user(&row.user, USER_WIDTH), width = USER_WIDTH);
        let punts = format!("{:>width$}", row.punts, width = NUMBER_WIDTH);
        let rest = format!(
            "{:>width$} {:>width$}",
            row.vali,
            row.revi,
            width = NUMBER_WIDTH
        );

        if use_colors {
            let punts = if row.punts < 0 {
                punts.red().to_string()
            } else {
                punts.bold().to_string()
            };
            format!("{} {} {} {}", index_str.dimmed(), user.yellow(), punts, rest)
        } else {
            format!("{} {} {} {}", index_str, user, punts, rest)
        }
    });

    let header = if use_colors {
        header.bold().to_string()
    } else {
        header
    };

    std::iter::once(header)
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, punts: i64, vali: i64, revi: i64) -> LeaderboardRow {
        LeaderboardRow {
            user: user.to_string(),
            punts,
            vali,
            revi,
        }
    }

    #[test]
    fn test_format_leaderboard_empty() {
        assert_eq!(format_leaderboard(&[], false), "No scoring events in the contest window.");
    }

    #[test]
    fn test_format_leaderboard_rows() {
        let rows = vec![row("carol", 7, 0, 1), row("alice", 5, 1, 1)];
        let result = format_leaderboard(&rows, false);
        let lines: Vec<&str> = result.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("punts"));
        assert!(lines[1].starts_with("  1. carol"));
        assert!(lines[2].starts_with("  2. alice"));
        assert!(lines[1].trim_end().ends_with('1'));
    }

    #[test]
    fn test_truncate_user() {
        assert_eq!(truncate_user("Alice", 25), "Alice");
        assert_eq!(truncate_user("A very long user name indeed", 10), "A very ...");
        assert_eq!(truncate_user("Hello", 3), "Hel");
    }

    #[test]
    fn test_negative_scores_shown() {
        let result = format_leaderboard(&[row("reverted", -3, 0, -1)], false);
        assert!(result.contains("-3"));
        assert!(result.contains("-1"));
    }
}
