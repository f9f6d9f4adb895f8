// ********* Errors ***********

use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Errors raised when a text cannot be read as a table at all.
///
/// Everything short of these (ragged rows, stray quotes, bad cells) is
/// absorbed by the parser.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ParseError {
    /// The text is empty or contains only whitespace: there is no header row.
    EmptyInput,
    /// The table could not be written back to text.
    Serialize { message: String },
}

impl Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "empty CSV input: a header row is required"),
            ParseError::Serialize { message } => write!(f, "could not write CSV: {}", message),
        }
    }
}

/// Structural errors when turning a raw table into entity records.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ShapeError {
    MissingKeyColumn { column: String },
    DuplicateKey { key: String },
}

impl Error for ShapeError {}

impl Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::MissingKeyColumn { column } => {
                write!(f, "key column {:?} is not in the header", column)
            }
            ShapeError::DuplicateKey { key } => write!(f, "duplicate entity key {:?}", key),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum ScoreError {
    /// The range of a term is empty, inverted or not finite.
    InvalidRange { field: String, min: f64, max: f64 },
    InvalidWeight { field: String, weight: f64 },
}

impl Error for ScoreError {}

impl Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreError::InvalidRange { field, min, max } => {
                write!(f, "invalid range [{}, {}] for field {:?}", min, max, field)
            }
            ScoreError::InvalidWeight { field, weight } => {
                write!(f, "invalid weight {} for field {:?}", weight, field)
            }
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum ClockError {
    NoSessions { country: String },
    MismatchedSessions { country: String, starts: usize, ends: usize },
    InvalidTime { country: String, value: f64 },
}

impl Error for ClockError {}

impl Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockError::NoSessions { country } => {
                write!(f, "{}: the schedule has no school session", country)
            }
            ClockError::MismatchedSessions {
                country,
                starts,
                ends,
            } => write!(
                f,
                "{}: {} start times but {} end times",
                country, starts, ends
            ),
            ClockError::InvalidTime { country, value } => {
                write!(f, "{}: invalid time of day {}", country, value)
            }
        }
    }
}

// ********* Configuration **********

/// What to do when the same entity key shows up on several rows.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateKeyPolicy {
    /// The later row replaces the earlier one. The entity keeps the
    /// position of its first appearance.
    #[default]
    LastWriteWins,
    KeepFirst,
    Reject,
}

/// How a score term treats an entity for which the field is missing.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MissingValuePolicy {
    /// Use the middle of the declared range, as if the entity were average.
    #[default]
    NeutralMidpoint,
    /// The term contributes nothing.
    Exclude,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}
