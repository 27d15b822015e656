//! crates/berichtsheft_core/src/error.rs
//!
//! Errors returned by report parsing and the report service.

use crate::ports::PortError;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report date and content are required")]
    MissingFields,
    #[error("invalid report date: {0}")]
    InvalidDate(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("report {0} not found")]
    ReportNotFound(String),
    #[error("no apprentice found")]
    NoApprentice,
    #[error("no report found to continue from")]
    NoPreviousReport,
    #[error("a report already exists for {0}")]
    DuplicateDate(DateTime<Utc>),
    #[error("a report already exists for the next date {0}")]
    NextDateTaken(DateTime<Utc>),
    #[error("text improvement returned no content")]
    EmptyAiResponse,
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ReportResult<T> = Result<T, ReportError>;
