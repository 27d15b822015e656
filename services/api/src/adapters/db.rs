//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ReportStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use berichtsheft_core::domain::{Apprentice, NewWeeklyReport, ReportStatus, WeeklyReport};
use berichtsheft_core::ports::{PortError, PortResult, ReportStore};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ReportStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ApprenticeRecord {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}
impl ApprenticeRecord {
    fn to_domain(self) -> Apprentice {
        Apprentice {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    apprentice_id: Uuid,
    report_date: DateTime<Utc>,
    raw_content: String,
    ai_content: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}
impl ReportRecord {
    fn to_domain(self) -> PortResult<WeeklyReport> {
        let status = self
            .status
            .parse::<ReportStatus>()
            .map_err(|e| PortError::Unexpected(format!("Report {}: {}", self.id, e)))?;
        Ok(WeeklyReport {
            id: self.id,
            apprentice_id: self.apprentice_id,
            report_date: self.report_date,
            raw_content: self.raw_content,
            ai_content: self.ai_content,
            status,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a violated `(apprentice_id, report_date)` constraint to `Conflict`.
fn write_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn report_not_found(report_id: Uuid) -> PortError {
    PortError::NotFound(format!("Report {} not found", report_id))
}

//=========================================================================================
// `ReportStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReportStore for DbAdapter {
    async fn find_default_apprentice(&self) -> PortResult<Option<Apprentice>> {
        let record = sqlx::query_as::<_, ApprenticeRecord>(
            "SELECT id, name, email, created_at FROM apprentices ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(ApprenticeRecord::to_domain))
    }

    async fn get_or_create_apprentice(&self, name: &str, email: &str) -> PortResult<Apprentice> {
        if let Some(existing) = self.find_default_apprentice().await? {
            return Ok(existing);
        }

        sqlx::query(
            "INSERT INTO apprentices (id, name, email) VALUES ($1, $2, $3) ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.find_default_apprentice()
            .await?
            .ok_or_else(|| PortError::NotFound("Default apprentice not found".to_string()))
    }

    async fn get_apprentice_by_id(&self, apprentice_id: Uuid) -> PortResult<Apprentice> {
        let record = sqlx::query_as::<_, ApprenticeRecord>(
            "SELECT id, name, email, created_at FROM apprentices WHERE id = $1",
        )
        .bind(apprentice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Apprentice {} not found", apprentice_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_report_by_id(&self, report_id: Uuid) -> PortResult<WeeklyReport> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, apprentice_id, report_date, raw_content, ai_content, status, created_at \
             FROM weekly_reports WHERE id = $1",
        )
        .bind(report_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => report_not_found(report_id),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn find_report_by_date(
        &self,
        apprentice_id: Uuid,
        report_date: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> PortResult<Option<WeeklyReport>> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, apprentice_id, report_date, raw_content, ai_content, status, created_at \
             FROM weekly_reports \
             WHERE apprentice_id = $1 AND report_date = $2 AND ($3::uuid IS NULL OR id <> $3) \
             LIMIT 1",
        )
        .bind(apprentice_id)
        .bind(report_date)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(ReportRecord::to_domain).transpose()
    }

    async fn find_latest_report(&self, apprentice_id: Uuid) -> PortResult<Option<WeeklyReport>> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, apprentice_id, report_date, raw_content, ai_content, status, created_at \
             FROM weekly_reports WHERE apprentice_id = $1 \
             ORDER BY report_date DESC LIMIT 1",
        )
        .bind(apprentice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(ReportRecord::to_domain).transpose()
    }

    async fn list_reports(&self, apprentice_id: Uuid) -> PortResult<Vec<WeeklyReport>> {
        let records = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, apprentice_id, report_date, raw_content, ai_content, status, created_at \
             FROM weekly_reports WHERE apprentice_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(apprentice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(ReportRecord::to_domain).collect()
    }

    async fn create_report(&self, report: NewWeeklyReport) -> PortResult<WeeklyReport> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "INSERT INTO weekly_reports (id, apprentice_id, report_date, raw_content, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, apprentice_id, report_date, raw_content, ai_content, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(report.apprentice_id)
        .bind(report.report_date)
        .bind(&report.raw_content)
        .bind(ReportStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        record.to_domain()
    }

    async fn update_report_content(
        &self,
        report_id: Uuid,
        report_date: DateTime<Utc>,
        raw_content: &str,
    ) -> PortResult<WeeklyReport> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "UPDATE weekly_reports SET report_date = $2, raw_content = $3 WHERE id = $1 \
             RETURNING id, apprentice_id, report_date, raw_content, ai_content, status, created_at",
        )
        .bind(report_id)
        .bind(report_date)
        .bind(raw_content)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| report_not_found(report_id))?;
        record.to_domain()
    }

    async fn update_report_status(
        &self,
        report_id: Uuid,
        status: ReportStatus,
    ) -> PortResult<WeeklyReport> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "UPDATE weekly_reports SET status = $2 WHERE id = $1 \
             RETURNING id, apprentice_id, report_date, raw_content, ai_content, status, created_at",
        )
        .bind(report_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| report_not_found(report_id))?;
        record.to_domain()
    }

    async fn update_report_ai_content(
        &self,
        report_id: Uuid,
        ai_content: &str,
    ) -> PortResult<WeeklyReport> {
        let record = sqlx::query_as::<_, ReportRecord>(
            "UPDATE weekly_reports SET ai_content = $2 WHERE id = $1 \
             RETURNING id, apprentice_id, report_date, raw_content, ai_content, status, created_at",
        )
        .bind(report_id)
        .bind(ai_content)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| report_not_found(report_id))?;
        record.to_domain()
    }
}
