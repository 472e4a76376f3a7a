use std::io;

use thiserror::Error;

use crate::record::MalformedKind;

/// Fatal pipeline errors. A run either produces the full output or exactly
/// one of these; no partial results are ever emitted.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("input I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {kind} in record {content:?}")]
    MalformedRecord {
        line: u64,
        content: String,
        kind: MalformedKind,
    },
}

impl AggregateError {
    /// Original input line number the error is tied to, when it has one.
    pub fn line(&self) -> Option<u64> {
        match self {
            AggregateError::MalformedRecord { line, .. } => Some(*line),
            AggregateError::Io(_) => None,
        }
    }
}
