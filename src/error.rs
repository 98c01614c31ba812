//! # error
//!
//! Error types for each pipeline stage.
//!
//! Only [`ReportError`] is ever fatal to a run. [`RowError`] makes the parser
//! skip one row, and [`PredictError`] only selects the pivot fallback; both
//! are logged and swallowed at their stage boundary.

use thiserror::Error;

/// Failure to obtain or read the daily report. Aborts the run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("report archive returned HTTP {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("report file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("response from {url} is not a bhavcopy (no SYMBOL header)")]
    NotAReport { url: String },

    #[error("report is missing required column: {0}")]
    MissingColumn(&'static str),
}

/// A single malformed report row.
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {field} is not numeric: '{value}'")]
    NotNumeric { field: &'static str, value: String },
}

/// Reason the AI branch of the predictor did not produce a result.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no AI provider configured")]
    Disabled,

    #[error("AI call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("AI call failed: {0:#}")]
    Transport(#[from] anyhow::Error),

    #[error("AI response malformed: {0}")]
    Malformed(String),
}
