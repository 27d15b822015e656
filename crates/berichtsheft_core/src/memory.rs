//! crates/berichtsheft_core/src/memory.rs
//!
//! An in-process `ReportStore`. Used when no database is configured and by tests.
//! Like the Postgres schema, it rejects a second report for the same
//! apprentice and date with `PortError::Conflict`.

use crate::domain::{Apprentice, NewWeeklyReport, ReportStatus, WeeklyReport};
use crate::ports::{PortError, PortResult, ReportStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    /// In creation order; the first entry is the default apprentice.
    apprentices: Vec<Apprentice>,
    /// In creation order.
    reports: Vec<WeeklyReport>,
}

impl MemoryState {
    /// The apprentice's report on `report_date`, ignoring the report `excluding`.
    fn report_on(
        &self,
        apprentice_id: Uuid,
        report_date: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> Option<&WeeklyReport> {
        self.reports.iter().find(|r| {
            r.apprentice_id == apprentice_id
                && r.report_date == report_date
                && Some(r.id) != excluding
        })
    }

    fn report_mut(&mut self, report_id: Uuid) -> PortResult<&mut WeeklyReport> {
        self.reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| PortError::NotFound(format!("Report {} not found", report_id)))
    }
}

#[derive(Default)]
pub struct InMemoryReportStore {
    state: Mutex<MemoryState>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another apprentice. The default apprentice stays the first one created.
    pub fn add_apprentice(&self, name: &str, email: &str) -> PortResult<Apprentice> {
        let mut state = self.lock()?;
        let apprentice = new_apprentice(name, email);
        state.apprentices.push(apprentice.clone());
        Ok(apprentice)
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

fn new_apprentice(name: &str, email: &str) -> Apprentice {
    Apprentice {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn find_default_apprentice(&self) -> PortResult<Option<Apprentice>> {
        Ok(self.lock()?.apprentices.first().cloned())
    }

    async fn get_or_create_apprentice(&self, name: &str, email: &str) -> PortResult<Apprentice> {
        let mut state = self.lock()?;
        if let Some(existing) = state.apprentices.first() {
            return Ok(existing.clone());
        }
        let apprentice = new_apprentice(name, email);
        state.apprentices.push(apprentice.clone());
        Ok(apprentice)
    }

    async fn get_apprentice_by_id(&self, apprentice_id: Uuid) -> PortResult<Apprentice> {
        self.lock()?
            .apprentices
            .iter()
            .find(|a| a.id == apprentice_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Apprentice {} not found", apprentice_id)))
    }

    async fn get_report_by_id(&self, report_id: Uuid) -> PortResult<WeeklyReport> {
        self.lock()?
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Report {} not found", report_id)))
    }

    async fn find_report_by_date(
        &self,
        apprentice_id: Uuid,
        report_date: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> PortResult<Option<WeeklyReport>> {
        Ok(self
            .lock()?
            .report_on(apprentice_id, report_date, excluding)
            .cloned())
    }

    async fn find_latest_report(&self, apprentice_id: Uuid) -> PortResult<Option<WeeklyReport>> {
        Ok(self
            .lock()?
            .reports
            .iter()
            .filter(|r| r.apprentice_id == apprentice_id)
            .max_by_key(|r| r.report_date)
            .cloned())
    }

    async fn list_reports(&self, apprentice_id: Uuid) -> PortResult<Vec<WeeklyReport>> {
        let mut reports: Vec<WeeklyReport> = self
            .lock()?
            .reports
            .iter()
            .rev()
            .filter(|r| r.apprentice_id == apprentice_id)
            .cloned()
            .collect();
        // Stable, so equal timestamps keep the newest insertion first.
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn create_report(&self, report: NewWeeklyReport) -> PortResult<WeeklyReport> {
        let mut state = self.lock()?;
        if !state.apprentices.iter().any(|a| a.id == report.apprentice_id) {
            return Err(PortError::NotFound(format!(
                "Apprentice {} not found",
                report.apprentice_id
            )));
        }
        if state
            .report_on(report.apprentice_id, report.report_date, None)
            .is_some()
        {
            return Err(PortError::Conflict(format!(
                "Report for {} already exists",
                report.report_date
            )));
        }

        let created = WeeklyReport {
            id: Uuid::new_v4(),
            apprentice_id: report.apprentice_id,
            report_date: report.report_date,
            raw_content: report.raw_content,
            ai_content: None,
            status: ReportStatus::Draft,
            created_at: Utc::now(),
        };
        state.reports.push(created.clone());
        Ok(created)
    }

    async fn update_report_content(
        &self,
        report_id: Uuid,
        report_date: DateTime<Utc>,
        raw_content: &str,
    ) -> PortResult<WeeklyReport> {
        let mut state = self.lock()?;
        let apprentice_id = state.report_mut(report_id)?.apprentice_id;
        if state
            .report_on(apprentice_id, report_date, Some(report_id))
            .is_some()
        {
            return Err(PortError::Conflict(format!(
                "Report for {} already exists",
                report_date
            )));
        }

        let report = state.report_mut(report_id)?;
        report.report_date = report_date;
        report.raw_content = raw_content.to_string();
        Ok(report.clone())
    }

    async fn update_report_status(
        &self,
        report_id: Uuid,
        status: ReportStatus,
    ) -> PortResult<WeeklyReport> {
        let mut state = self.lock()?;
        let report = state.report_mut(report_id)?;
        report.status = status;
        Ok(report.clone())
    }

    async fn update_report_ai_content(
        &self,
        report_id: Uuid,
        ai_content: &str,
    ) -> PortResult<WeeklyReport> {
        let mut state = self.lock()?;
        let report = state.report_mut(report_id)?;
        report.ai_content = Some(ai_content.to_string());
        Ok(report.clone())
    }
}
