//! Scoring state machine.
//!
//! Replays one page history and turns quality transitions into scoring
//! events. Forward transitions (reaching 75% or 100%) are rewarded when they
//! happen inside the contest window; transitions that undo an in-window
//! achievement take the points back from whoever earned them, even when the
//! undo lands after the contest closed.

use chrono::{DateTime, Utc};
use std::fmt;

use super::history::{PageHistory, Revision};
use super::quality::QualityLevel;
use super::tally::{ScoreDelta, UserScore};
use super::window::ContestWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// 50% -> 75%
    ProofreadFromProblematic,
    /// none/0%/25% -> 75%
    ProofreadFromScratch,
    /// 75% -> 100%
    Validation,
    /// 100% -> 75%, by someone other than the validator
    RevertedValidation,
    /// 75% -> 50%
    RevertedProofreadToProblematic,
    /// 75% -> 0%/25%
    RevertedProofread,
    /// 50% -> 0%/25%
    RevertedProblematic,
}

impl Rule {
    /// Case number used in the contest rules.
    pub fn case(self) -> &'static str {
        match self {
            Rule::ProofreadFromProblematic => "1a",
            Rule::ProofreadFromScratch => "1b",
            Rule::Validation => "2",
            Rule::RevertedValidation => "3",
            Rule::RevertedProofreadToProblematic => "4a",
            Rule::RevertedProofread => "4b",
            Rule::RevertedProblematic => "5",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rule::ProofreadFromProblematic => "proofread the page, SAL 50% -> SAL 75%",
            Rule::ProofreadFromScratch => "proofread the page, SAL 0/25% -> SAL 75%",
            Rule::Validation => "validation",
            Rule::RevertedValidation => "reverted validation",
            Rule::RevertedProofreadToProblematic => "reverted proofread, SAL 75% -> SAL 50%",
            Rule::RevertedProofread => "reverted proofread, SAL 75% -> SAL 0/25%",
            Rule::RevertedProblematic => "reverted SAL 50% -> SAL 0/25%",
        }
    }

    /// Score change applied to the credited user.
    pub fn score(self) -> UserScore {
        match self {
            Rule::ProofreadFromProblematic => UserScore::new(3, 0, 1),
            Rule::ProofreadFromScratch => UserScore::new(5, 0, 1),
            Rule::Validation => UserScore::new(1, 1, 0),
            Rule::RevertedValidation => UserScore::new(-1, -1, 0),
            Rule::RevertedProofreadToProblematic => UserScore::new(-3, 0, -1),
            Rule::RevertedProofread => UserScore::new(-5, 0, -1),
            Rule::RevertedProblematic => UserScore::new(-2, 0, -1),
        }
    }

    /// Reverts are charged to the author of the reverted revision.
    pub fn is_revert(self) -> bool {
        matches!(
            self,
            Rule::RevertedValidation
                | Rule::RevertedProofreadToProblematic
                | Rule::RevertedProofread
                | Rule::RevertedProblematic
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {}", self.case())
    }
}

/// A transition that changes somebody's score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringEvent {
    pub rule: Rule,
    /// User whose score changes.
    pub user: String,
    /// Author of the revision that triggered the event.
    pub actor: String,
    /// Time of the triggering revision.
    pub timestamp: DateTime<Utc>,
}

/// Decide which rule, if any, the step `previous -> current` fires.
fn transition(
    previous: Option<&Revision>,
    current: &Revision,
    window: &ContestWindow,
) -> Option<Rule> {
    use QualityLevel::*;

    let Some(previous) = previous else {
        // A page created directly at 75% counts as proofread from scratch.
        return (current.level == Proofread && window.is_open_at(current.timestamp))
            .then_some(Rule::ProofreadFromScratch);
    };

    let forward = window.is_open_at(current.timestamp);
    let revert_counts =
        window.has_started_by(current.timestamp) && window.covers(previous.timestamp);

    match (previous.level, current.level) {
        (WithoutText | Partial, Proofread) if forward => Some(Rule::ProofreadFromScratch),
        (Problematic, Proofread) if forward => Some(Rule::ProofreadFromProblematic),
        (Proofread, Validated) if forward => Some(Rule::Validation),
        (Validated, Proofread) if revert_counts && previous.user != current.user => {
            Some(Rule::RevertedValidation)
        }
        (Proofread, Problematic) if revert_counts => Some(Rule::RevertedProofreadToProblematic),
        (Proofread, WithoutText | Partial) if revert_counts => Some(Rule::RevertedProofread),
        (Problematic, WithoutText | Partial) if revert_counts => Some(Rule::RevertedProblematic),
        _ => None,
    }
}

/// Walk a page history and list every scoring event, oldest first.
pub fn scoring_events(history: &PageHistory, window: &ContestWindow) -> Vec<ScoringEvent> {
    let mut events = Vec::new();
    let mut previous: Option<&Revision> = None;

    for current in history {
        if let Some(rule) = transition(previous, current, window) {
            let credited = match (rule.is_revert(), previous) {
                (true, Some(previous)) => previous,
                _ => current,
            };
            tracing::debug!(
                user = %credited.user,
                actor = %current.user,
                timestamp = %current.timestamp,
                "{}: {}",
                rule,
                rule.description()
            );
            events.push(ScoringEvent {
                rule,
                user: credited.user.clone(),
                actor: current.user.clone(),
                timestamp: current.timestamp,
            });
        }
        previous = Some(current);
    }

    events
}

/// Score a page: fold its scoring events into per-user deltas.
pub fn score_page(history: PageHistory, window: &ContestWindow) -> ScoreDelta {
    let mut delta = ScoreDelta::new();
    for event in scoring_events(&history, window) {
        delta.credit(&event.user, event.rule.score());
    }
    delta
}
