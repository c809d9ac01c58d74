use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// ProofreadPage marker embedded in every page revision, e.g.
/// `<pagequality level="3" user="Alice" />`.
static PAGEQUALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<pagequality\s+level="(\d+)"\s+user="(.*?)"\s*/>"#)
        .expect("Invalid pagequality regex")
});

/// Proofreading maturity of a page.
///
/// Variants are ordered, so `level <= QualityLevel::Partial` reads as
/// "at most 25%".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityLevel {
    /// 0%: page without text
    WithoutText = 0,
    /// 25%: not proofread
    Partial = 1,
    /// 50%: problematic
    Problematic = 2,
    /// 75%: proofread
    Proofread = 3,
    /// 100%: validated
    Validated = 4,
}

impl QualityLevel {
    /// Map the marker's level digit (0-4) to a quality level.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::WithoutText),
            1 => Some(Self::Partial),
            2 => Some(Self::Problematic),
            3 => Some(Self::Proofread),
            4 => Some(Self::Validated),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Completion percentage shown by the wiki (0, 25, 50, 75, 100).
    pub fn percent(self) -> u8 {
        self.level() * 25
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no pagequality marker in revision text")]
    Missing,
    #[error("{0} pagequality markers in revision text, expected exactly one")]
    Multiple(usize),
    #[error("invalid pagequality level '{0}'")]
    InvalidLevel(String),
}

/// Extract the quality level from a revision's raw wikitext.
///
/// The marker's `user` attribute is ignored: attribution always comes from
/// the revision author.
pub fn extract_quality(text: &str) -> Result<QualityLevel, ExtractionError> {
    let mut markers = PAGEQUALITY.captures_iter(text);

    let first = markers.next().ok_or(ExtractionError::Missing)?;
    let extra = markers.count();
    if extra > 0 {
        return Err(ExtractionError::Multiple(extra + 1));
    }

    let digits = &first[1];
    digits
        .parse::<u8>()
        .ok()
        .and_then(QualityLevel::from_level)
        .ok_or_else(|| ExtractionError::InvalidLevel(digits.to_string()))
}
