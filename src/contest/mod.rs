pub mod history;
pub mod machine;
pub mod quality;
pub mod ranking;
pub mod tally;
pub mod window;

pub use history::{normalize, HistoryError, PageHistory, RawRevision, Revision};
pub use machine::{score_page, scoring_events, Rule, ScoringEvent};
pub use quality::{extract_quality, ExtractionError, QualityLevel};
pub use ranking::{rank, rank_rows, LeaderboardRow, Ranked};
pub use tally::{ScoreDelta, UserScore};
pub use window::{ContestWindow, WindowError};
