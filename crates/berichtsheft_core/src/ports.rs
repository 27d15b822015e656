//! crates/berichtsheft_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Apprentice, NewWeeklyReport, ReportStatus, WeeklyReport};
use crate::prompt::PromptExample;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A write collided with a uniqueness constraint of the store.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ReportStore: Send + Sync {
    // --- Apprentice Management ---

    /// Returns the first apprentice ever created, if any.
    async fn find_default_apprentice(&self) -> PortResult<Option<Apprentice>>;

    /// Returns the first apprentice, creating one from `name`/`email` when none exists.
    /// Calling this repeatedly never creates more than one apprentice.
    async fn get_or_create_apprentice(&self, name: &str, email: &str) -> PortResult<Apprentice>;

    async fn get_apprentice_by_id(&self, apprentice_id: Uuid) -> PortResult<Apprentice>;

    // --- Report Queries ---

    async fn get_report_by_id(&self, report_id: Uuid) -> PortResult<WeeklyReport>;

    /// Finds a report of the apprentice at exactly `report_date`, ignoring `excluding`.
    async fn find_report_by_date(
        &self,
        apprentice_id: Uuid,
        report_date: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> PortResult<Option<WeeklyReport>>;

    /// The apprentice's report with the greatest `report_date`.
    async fn find_latest_report(&self, apprentice_id: Uuid) -> PortResult<Option<WeeklyReport>>;

    /// All reports of the apprentice, newest `created_at` first.
    async fn list_reports(&self, apprentice_id: Uuid) -> PortResult<Vec<WeeklyReport>>;

    // --- Report Mutations ---

    /// Inserts a `Draft` report. Fails with `Conflict` if the apprentice
    /// already has a report at the same date.
    async fn create_report(&self, report: NewWeeklyReport) -> PortResult<WeeklyReport>;

    async fn update_report_content(
        &self,
        report_id: Uuid,
        report_date: DateTime<Utc>,
        raw_content: &str,
    ) -> PortResult<WeeklyReport>;

    async fn update_report_status(
        &self,
        report_id: Uuid,
        status: ReportStatus,
    ) -> PortResult<WeeklyReport>;

    async fn update_report_ai_content(
        &self,
        report_id: Uuid,
        ai_content: &str,
    ) -> PortResult<WeeklyReport>;
}

/// Everything the text-improvement gateway needs for one completion.
#[derive(Debug, Clone, Copy)]
pub struct ImproveRequest<'a> {
    pub system: &'a str,
    pub examples: &'a [PromptExample],
    pub input: &'a str,
}

#[async_trait]
pub trait TextImprovementService: Send + Sync {
    /// Rewrites the input text. An empty string means the model produced no text.
    async fn improve_text(&self, request: ImproveRequest<'_>) -> PortResult<String>;
}
