//! Local checks of typed questions, ratings and search queries

use std::collections::HashSet;
use thiserror::Error;

/// Shortest accepted question, characters after trimming
pub const QUESTION_MIN_CHARS: usize = 10;
/// Longest accepted question, characters after trimming
pub const QUESTION_MAX_CHARS: usize = 2000;
/// Shortest accepted search query
pub const QUERY_MIN_CHARS: usize = 2;

const MIN_DISTINCT_CHARS: usize = 3;
const SPAM_PATTERNS: &[&str] = &["aaaa", "bbbb", "ээээ", "ееее"];

/// User input that failed a local check. Always answered with a re-prompt.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Below the minimum length
    #[error("input too short")]
    TooShort,
    /// Above the maximum length
    #[error("input too long")]
    TooLong,
    /// Too few distinct characters or a repeated-character pattern
    #[error("input looks like spam")]
    Trivial,
    /// Not an integer
    #[error("not a number")]
    NotANumber,
    /// Integer outside the accepted range
    #[error("out of range")]
    OutOfRange,
}

/// Trimmed question text if it is long enough, short enough and not spam
///
/// # Errors
///
/// Returns the first failed check.
pub fn validate_question(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    let len = text.chars().count();
    if len < QUESTION_MIN_CHARS {
        return Err(ValidationError::TooShort);
    }
    if len > QUESTION_MAX_CHARS {
        return Err(ValidationError::TooLong);
    }
    if is_trivial(text) {
        return Err(ValidationError::Trivial);
    }
    Ok(text)
}

fn is_trivial(text: &str) -> bool {
    let distinct: HashSet<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if distinct.len() < MIN_DISTINCT_CHARS {
        return true;
    }
    let lower = text.to_lowercase();
    SPAM_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Stars 1..=5 from a callback number
///
/// # Errors
///
/// `OutOfRange` outside 1..=5.
pub fn validate_stars(stars: i64) -> Result<u8, ValidationError> {
    u8::try_from(stars)
        .ok()
        .filter(|s| (1..=5).contains(s))
        .ok_or(ValidationError::OutOfRange)
}

/// Stars 1..=5 from typed text
///
/// # Errors
///
/// `NotANumber` for non-integers, `OutOfRange` outside 1..=5.
pub fn validate_rating(text: &str) -> Result<u8, ValidationError> {
    let stars: i64 = text
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber)?;
    validate_stars(stars)
}

/// Trimmed search query of at least two characters
///
/// # Errors
///
/// `TooShort` for shorter input.
pub fn validate_query(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.chars().count() < QUERY_MIN_CHARS {
        return Err(ValidationError::TooShort);
    }
    Ok(text)
}
