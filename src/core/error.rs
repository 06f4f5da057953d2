use std::ops::Range;

use thiserror::Error;

/// Errors surfaced by the scoring pipeline and the CSV materializer.
///
/// None of these are retried internally. [`SentimentError::scope`] tells the
/// caller whether the process can go on issuing new calls.
#[derive(Debug, Error)]
pub enum SentimentError {
    /// The required text column is absent from the input table.
    #[error("input is missing required column `{column}` (found: {found})")]
    Schema { column: String, found: String },

    /// The tokenizer or the classifier weights could not be initialized.
    #[error("failed to load model `{model}`: {reason}")]
    ModelLoad { model: String, reason: String },

    /// A forward pass failed; `rows` is the row-index range of the batch.
    #[error("inference failed for rows {rows:?}: {reason}")]
    Inference { rows: Range<usize>, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Result assembly found an input row without a matching score.
    #[error("no score record for row {0}")]
    MissingScore(usize),

    #[error("more than one score record for row {0}")]
    DuplicateScore(usize),

    /// A score record names a row the input table does not have.
    #[error("score record for row {row} but the table has {rows} rows")]
    UnmatchedScore { row: usize, rows: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// The model session is unusable; nothing else can be scored.
    Process,
    /// Only the current call failed.
    Call,
}

impl SentimentError {
    pub fn scope(&self) -> FailureScope {
        match self {
            SentimentError::ModelLoad { .. } => FailureScope::Process,
            _ => FailureScope::Call,
        }
    }

    /// Row index a caller should resume from after re-sharding, if any.
    pub fn resume_from(&self) -> Option<usize> {
        match self {
            SentimentError::Inference { rows, .. } => Some(rows.start),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SentimentError>;
