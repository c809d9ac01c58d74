use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Points and event counts of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UserScore {
    pub punts: i64,
    pub vali: i64,
    pub revi: i64,
}

impl UserScore {
    pub const fn new(punts: i64, vali: i64, revi: i64) -> Self {
        Self { punts, vali, revi }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for UserScore {
    type Output = UserScore;

    fn add(self, rhs: Self) -> Self::Output {
        UserScore {
            punts: self.punts + rhs.punts,
            vali: self.vali + rhs.vali,
            revi: self.revi + rhs.revi,
        }
    }
}

impl AddAssign for UserScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Per-user score changes, for a page, a book or the whole contest.
///
/// Merging is field-wise addition with absent users counting as zero, so it
/// is associative and commutative: pages and books can be tallied in any
/// order or grouping and reduced at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreDelta {
    users: BTreeMap<String, UserScore>,
}

impl ScoreDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `score` to `user`'s entry.
    pub fn credit(&mut self, user: &str, score: UserScore) {
        match self.users.get_mut(user) {
            Some(entry) => *entry += score,
            None => {
                self.users.insert(user.to_string(), score);
            }
        }
    }

    /// Merge another delta into this one.
    pub fn merge(&mut self, other: ScoreDelta) {
        for (user, score) in other.users {
            *self.users.entry(user).or_default() += score;
        }
    }

    /// Score of `user`, zero if never credited.
    pub fn get(&self, user: &str) -> UserScore {
        self.users.get(user).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Users in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserScore)> {
        self.users.iter().map(|(user, score)| (user.as_str(), score))
    }

    /// True when every user's score is zero (or there are no users).
    pub fn is_neutral(&self) -> bool {
        self.users.values().all(UserScore::is_zero)
    }
}

impl AddAssign for ScoreDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(rhs);
    }
}

impl Add for ScoreDelta {
    type Output = ScoreDelta;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.merge(rhs);
        self
    }
}

impl Sum for ScoreDelta {
    fn sum<I: Iterator<Item = ScoreDelta>>(iter: I) -> Self {
        iter.fold(ScoreDelta::new(), Add::add)
    }
}

impl<S: Into<String>> FromIterator<(S, UserScore)> for ScoreDelta {
    fn from_iter<T: IntoIterator<Item = (S, UserScore)>>(iter: T) -> Self {
        let mut delta = ScoreDelta::new();
        for (user, score) in iter {
            let user: String = user.into();
            delta.credit(&user, score);
        }
        delta
    }
}
