use std::cmp::Reverse;

use super::tally::ScoreDelta;

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user: String,
    pub punts: i64,
    pub vali: i64,
    pub revi: i64,
}

/// Something that can be placed on the leaderboard.
pub trait Ranked {
    fn user(&self) -> &str;

    /// `(punts, revi, vali)`, compared descending.
    fn rank_key(&self) -> (i64, i64, i64);
}

impl Ranked for LeaderboardRow {
    fn user(&self) -> &str {
        &self.user
    }

    fn rank_key(&self) -> (i64, i64, i64) {
        (self.punts, self.revi, self.vali)
    }
}

/// Order rows by `(punts, revi, vali)` descending, then user ascending.
///
/// Two stable sorts: usernames ascending first, then the score tuple
/// descending, which keeps equal tuples in username order.
pub fn rank_rows<T: Ranked>(mut rows: Vec<T>) -> Vec<T> {
    rows.sort_by(|a, b| a.user().cmp(b.user()));
    rows.sort_by_key(|row| Reverse(row.rank_key()));
    rows
}

/// Build the contest leaderboard from the final totals.
pub fn rank(totals: &ScoreDelta) -> Vec<LeaderboardRow> {
    let rows = totals
        .iter()
        .map(|(user, score)| LeaderboardRow {
            user: user.to_string(),
            punts: score.punts,
            vali: score.vali,
            revi: score.revi,
        })
        .collect();
    rank_rows(rows)
}
