use std::io;
use thiserror::Error;

use crate::refresh::{RefreshReport, Stage};

/// Error type for structural inference.
///
/// Only I/O-level problems are errors. Weak or contradictory signals are
/// reported through [`crate::Detection`] and [`crate::StageOutcome`].
#[derive(Error, Debug)]
pub enum SniffError {
    /// IO error while reading the byte source.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The record reader rejected the header row.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A failure raised while a refresh pass was running a stage.
    ///
    /// `report` holds the outcomes up to and including the failed stage.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        report: Box<RefreshReport>,
        #[source]
        source: Box<SniffError>,
    },
}

impl SniffError {
    /// The stage that failed, for errors raised during a refresh.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SniffError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Partial report of the refresh that failed.
    pub fn report(&self) -> Option<&RefreshReport> {
        match self {
            SniffError::Stage { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// A caller-supplied override that cannot work together with the rest of
/// the descriptor. The override is dropped and the detector runs instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOverride {
    #[error("qualifier {0:?} equals the delimiter; qualifier override ignored")]
    QualifierEqualsDelimiter(char),

    #[error("escape character {0:?} equals the delimiter; escape override ignored")]
    EscapeEqualsDelimiter(char),

    #[error("delimiter {0:?} is not a single-byte character; delimiter override ignored")]
    NonAsciiDelimiter(char),

    #[error("qualifier {0:?} is not a single-byte character; qualifier override ignored")]
    NonAsciiQualifier(char),

    #[error("code page {0} has no known decoder; encoding override ignored")]
    UnknownCodePage(u32),
}

/// Marker returned when the caller requested cancellation mid-scan.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Result type alias for inference operations.
pub type Result<T> = std::result::Result<T, SniffError>;
