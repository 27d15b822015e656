//! crates/berichtsheft_core/src/service.rs
//!
//! The report lifecycle service: per-apprentice date uniqueness, status
//! normalization, next-date derivation and AI improvement of report text.

use crate::domain::{
    next_report_date, next_report_placeholder, Apprentice, ApprenticeProfile, NewWeeklyReport,
    ReportDraft, ReportOverview, ReportWithApprentice, RequestedStatus, WeeklyReport,
};
use crate::error::{ReportError, ReportResult};
use crate::ports::{PortError, ReportStore, TextImprovementService};
use crate::prompt::ImprovePrompt;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// Operation Results
//=========================================================================================

/// The outcome of "create next".
#[derive(Debug, Clone)]
pub struct CreatedNextReport {
    pub report: ReportWithApprentice,
    pub previous_report_date: DateTime<Utc>,
}

/// The outcome of an AI improvement.
#[derive(Debug, Clone)]
pub struct ImprovedReport {
    pub ai_content: String,
    pub report: ReportWithApprentice,
}

//=========================================================================================
// The Service
//=========================================================================================

/// Enforces the report rules on top of a `ReportStore` and a `TextImprovementService`.
///
/// Every operation acts on the implicit default apprentice. Date uniqueness is
/// checked before writing; stores that reject duplicates on their own
/// (`PortError::Conflict`) close the gap between check and write.
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    improver: Arc<dyn TextImprovementService>,
    prompt: ImprovePrompt,
    default_apprentice: ApprenticeProfile,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        improver: Arc<dyn TextImprovementService>,
        prompt: ImprovePrompt,
        default_apprentice: ApprenticeProfile,
    ) -> Self {
        Self {
            store,
            improver,
            prompt,
            default_apprentice,
        }
    }

    pub fn prompt(&self) -> &ImprovePrompt {
        &self.prompt
    }

    /// Resolves the implicit apprentice, creating it on first use.
    pub async fn default_apprentice(&self) -> ReportResult<Apprentice> {
        let profile = &self.default_apprentice;
        Ok(self
            .store
            .get_or_create_apprentice(&profile.name, &profile.email)
            .await?)
    }

    /// All reports of the implicit apprentice, newest created first.
    pub async fn list_reports(&self) -> ReportResult<Vec<ReportWithApprentice>> {
        let apprentice = self.default_apprentice().await?;
        let reports = self.store.list_reports(apprentice.id).await?;
        Ok(reports
            .into_iter()
            .map(|report| ReportWithApprentice {
                report,
                apprentice: apprentice.clone(),
            })
            .collect())
    }

    pub async fn overview(&self) -> ReportResult<ReportOverview> {
        let apprentice = self.default_apprentice().await?;
        let reports = self.store.list_reports(apprentice.id).await?;
        Ok(ReportOverview::build(apprentice, reports))
    }

    pub async fn create_report(&self, draft: ReportDraft) -> ReportResult<ReportWithApprentice> {
        let apprentice = self.default_apprentice().await?;
        let report_date = draft.report_date;

        if self
            .store
            .find_report_by_date(apprentice.id, report_date, None)
            .await?
            .is_some()
        {
            return Err(ReportError::DuplicateDate(report_date));
        }

        let report = self
            .store
            .create_report(NewWeeklyReport {
                apprentice_id: apprentice.id,
                report_date,
                raw_content: draft.raw_content,
            })
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => ReportError::DuplicateDate(report_date),
                other => other.into(),
            })?;

        Ok(ReportWithApprentice { report, apprentice })
    }

    /// Overwrites date and raw content. `ai_content` and `status` are left as they are.
    pub async fn update_report(
        &self,
        report_id: Uuid,
        draft: ReportDraft,
    ) -> ReportResult<ReportWithApprentice> {
        let existing = self.find_report(report_id).await?;
        let report_date = draft.report_date;

        if self
            .store
            .find_report_by_date(existing.apprentice_id, report_date, Some(report_id))
            .await?
            .is_some()
        {
            return Err(ReportError::DuplicateDate(report_date));
        }

        let report = self
            .store
            .update_report_content(report_id, report_date, &draft.raw_content)
            .await
            .map_err(|e| write_error(e, report_id, report_date))?;

        self.with_apprentice(report).await
    }

    /// Stores the normalized form of `requested`; `Completed` is stored as `Draft`.
    pub async fn set_status(
        &self,
        report_id: Uuid,
        requested: RequestedStatus,
    ) -> ReportResult<ReportWithApprentice> {
        let status = requested.normalize();
        self.find_report(report_id).await?;

        let report = self
            .store
            .update_report_status(report_id, status)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ReportError::ReportNotFound(report_id.to_string()),
                other => other.into(),
            })?;

        self.with_apprentice(report).await
    }

    /// Creates the report one week after the apprentice's latest report.
    ///
    /// Unlike `create_report`, this never creates the apprentice.
    pub async fn create_next_report(&self) -> ReportResult<CreatedNextReport> {
        let apprentice = self
            .store
            .find_default_apprentice()
            .await?
            .ok_or(ReportError::NoApprentice)?;
        let latest = self
            .store
            .find_latest_report(apprentice.id)
            .await?
            .ok_or(ReportError::NoPreviousReport)?;

        let next_date = next_report_date(latest.report_date)
            .ok_or_else(|| ReportError::InvalidDate(latest.report_date.to_rfc3339()))?;
        if self
            .store
            .find_report_by_date(apprentice.id, next_date, None)
            .await?
            .is_some()
        {
            return Err(ReportError::NextDateTaken(next_date));
        }

        let report = self
            .store
            .create_report(NewWeeklyReport {
                apprentice_id: apprentice.id,
                report_date: next_date,
                raw_content: next_report_placeholder(latest.report_date, next_date),
            })
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => ReportError::NextDateTaken(next_date),
                other => other.into(),
            })?;

        Ok(CreatedNextReport {
            report: ReportWithApprentice { report, apprentice },
            previous_report_date: latest.report_date,
        })
    }

    /// Sends the raw content through the improve prompt and stores the answer
    /// as `ai_content`, replacing any previous value. Nothing is written when
    /// the gateway fails or answers with blank text.
    pub async fn improve_report(&self, report_id: Uuid) -> ReportResult<ImprovedReport> {
        let report = self.find_report(report_id).await?;

        let ai_content = self
            .improver
            .improve_text(self.prompt.request(&report.raw_content))
            .await?;
        if ai_content.trim().is_empty() {
            return Err(ReportError::EmptyAiResponse);
        }

        let updated = self
            .store
            .update_report_ai_content(report_id, &ai_content)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ReportError::ReportNotFound(report_id.to_string()),
                other => other.into(),
            })?;

        Ok(ImprovedReport {
            ai_content,
            report: self.with_apprentice(updated).await?,
        })
    }

    async fn find_report(&self, report_id: Uuid) -> ReportResult<WeeklyReport> {
        self.store
            .get_report_by_id(report_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ReportError::ReportNotFound(report_id.to_string()),
                other => other.into(),
            })
    }

    async fn with_apprentice(&self, report: WeeklyReport) -> ReportResult<ReportWithApprentice> {
        let apprentice = self.store.get_apprentice_by_id(report.apprentice_id).await?;
        Ok(ReportWithApprentice { report, apprentice })
    }
}

fn write_error(err: PortError, report_id: Uuid, report_date: DateTime<Utc>) -> ReportError {
    match err {
        PortError::NotFound(_) => ReportError::ReportNotFound(report_id.to_string()),
        PortError::Conflict(_) => ReportError::DuplicateDate(report_date),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_report_date, ReportStatus};
    use crate::memory::InMemoryReportStore;
    use crate::ports::{ImproveRequest, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with a fixed result and records the inputs.
    struct ScriptedImprover {
        answer: Result<String, String>,
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    impl ScriptedImprover {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextImprovementService for ScriptedImprover {
        async fn improve_text(&self, request: ImproveRequest<'_>) -> PortResult<String> {
            self.seen.lock().unwrap().push((
                request.system.to_string(),
                request.examples.len(),
                request.input.to_string(),
            ));
            self.answer.clone().map_err(PortError::Unexpected)
        }
    }

    fn service_with(
        store: Arc<InMemoryReportStore>,
        improver: Arc<ScriptedImprover>,
    ) -> ReportService {
        ReportService::new(
            store,
            improver,
            ImprovePrompt::default(),
            ApprenticeProfile::default(),
        )
    }

    fn service() -> (ReportService, Arc<InMemoryReportStore>) {
        let store = Arc::new(InMemoryReportStore::new());
        (
            service_with(store.clone(), ScriptedImprover::answering("Verbessert")),
            store,
        )
    }

    fn draft(date: &str, content: &str) -> ReportDraft {
        ReportDraft::parse(Some(date), Some(content)).unwrap()
    }

    fn date(s: &str) -> DateTime<Utc> {
        parse_report_date(s).unwrap()
    }

    #[tokio::test]
    async fn create_defaults_to_draft_and_joins_apprentice() {
        let (service, _) = service();

        let created = service
            .create_report(draft("2024-01-08", "Montag: Netzwerk geprüft"))
            .await
            .unwrap();

        assert_eq!(created.report.status, ReportStatus::Draft);
        assert_eq!(created.report.ai_content, None);
        assert_eq!(created.report.report_date, date("2024-01-08"));
        assert_eq!(created.apprentice.name, "Demo Azubi");
        assert_eq!(created.apprentice.email, "demo@azubi.de");
    }

    #[tokio::test]
    async fn duplicate_date_is_rejected_without_writing() {
        let (service, _) = service();
        service.create_report(draft("2024-01-08", "Erste Woche")).await.unwrap();

        let err = service
            .create_report(draft("2024-01-08", "Nochmal"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::DuplicateDate(d) if d == date("2024-01-08")));
        assert_eq!(service.list_reports().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_day_at_different_time_is_not_a_duplicate() {
        let (service, _) = service();
        service.create_report(draft("2024-01-08", "Morgens")).await.unwrap();

        service
            .create_report(draft("2024-01-08T12:00:00Z", "Mittags"))
            .await
            .unwrap();

        assert_eq!(service.list_reports().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn uniqueness_is_per_apprentice() {
        let (service, store) = service();
        service.default_apprentice().await.unwrap();
        let other = store.add_apprentice("Zweiter Azubi", "zwei@azubi.de").unwrap();
        store
            .create_report(NewWeeklyReport {
                apprentice_id: other.id,
                report_date: date("2024-01-08"),
                raw_content: "Fremder Bericht".to_string(),
            })
            .await
            .unwrap();

        let created = service
            .create_report(draft("2024-01-08", "Eigener Bericht"))
            .await
            .unwrap();

        assert_ne!(created.apprentice.id, other.id);
        assert_eq!(service.list_reports().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_creates_apprentice_and_orders_newest_first() {
        let (service, store) = service();
        assert!(service.list_reports().await.unwrap().is_empty());
        assert!(store.find_default_apprentice().await.unwrap().is_some());

        let first = service.create_report(draft("2024-01-15", "A")).await.unwrap();
        let second = service.create_report(draft("2024-01-08", "B")).await.unwrap();

        let listed = service.list_reports().await.unwrap();
        assert_eq!(listed[0].report.id, second.report.id);
        assert_eq!(listed[1].report.id, first.report.id);
    }

    #[tokio::test]
    async fn update_to_own_date_succeeds_and_keeps_ai_and_status() {
        let (service, _) = service();
        let created = service.create_report(draft("2024-01-08", "Alt")).await.unwrap();
        let id = created.report.id;
        service.improve_report(id).await.unwrap();
        service.set_status(id, RequestedStatus::Submitted).await.unwrap();

        let updated = service
            .update_report(id, draft("2024-01-08", "Neu"))
            .await
            .unwrap();

        assert_eq!(updated.report.raw_content, "Neu");
        assert_eq!(updated.report.ai_content.as_deref(), Some("Verbessert"));
        assert_eq!(updated.report.status, ReportStatus::Submitted);
    }

    #[tokio::test]
    async fn update_onto_another_reports_date_conflicts() {
        let (service, _) = service();
        service.create_report(draft("2024-01-08", "A")).await.unwrap();
        let second = service.create_report(draft("2024-01-15", "B")).await.unwrap();

        let err = service
            .update_report(second.report.id, draft("2024-01-08", "B geändert"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::DuplicateDate(_)));
        let listed = service.list_reports().await.unwrap();
        let unchanged = listed.iter().find(|r| r.report.id == second.report.id).unwrap();
        assert_eq!(unchanged.report.raw_content, "B");
        assert_eq!(unchanged.report.report_date, date("2024-01-15"));
    }

    #[tokio::test]
    async fn update_unknown_report_is_not_found() {
        let (service, _) = service();
        let err = service
            .update_report(Uuid::new_v4(), draft("2024-01-08", "A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ReportNotFound(_)));
    }

    #[tokio::test]
    async fn completed_is_stored_as_draft() {
        let (service, _) = service();
        let created = service.create_report(draft("2024-01-08", "A")).await.unwrap();
        let id = created.report.id;

        let submitted = service.set_status(id, RequestedStatus::Submitted).await.unwrap();
        assert_eq!(submitted.report.status, ReportStatus::Submitted);

        let completed = service.set_status(id, RequestedStatus::Completed).await.unwrap();
        assert_eq!(completed.report.status, ReportStatus::Draft);
    }

    #[tokio::test]
    async fn status_of_unknown_report_is_not_found() {
        let (service, _) = service();
        let err = service
            .set_status(Uuid::new_v4(), RequestedStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ReportNotFound(_)));
    }

    #[tokio::test]
    async fn create_next_derives_consecutive_weeks() {
        let (service, _) = service();
        service.create_report(draft("2024-01-08", "Erste Woche")).await.unwrap();

        let next = service.create_next_report().await.unwrap();
        assert_eq!(next.report.report.report_date, date("2024-01-15"));
        assert_eq!(next.previous_report_date, date("2024-01-08"));
        assert_eq!(next.report.report.status, ReportStatus::Draft);
        assert_eq!(next.report.report.ai_content, None);
        assert!(next.report.report.raw_content.contains("8.1.2024"));
        assert!(next.report.report.raw_content.contains("15.1.2024"));

        let after = service.create_next_report().await.unwrap();
        assert_eq!(after.report.report.report_date, date("2024-01-22"));
    }

    #[tokio::test]
    async fn create_next_without_apprentice_does_not_create_one() {
        let (service, store) = service();
        let err = service.create_next_report().await.unwrap_err();
        assert!(matches!(err, ReportError::NoApprentice));
        assert!(store.find_default_apprentice().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_next_without_reports_fails() {
        let (service, _) = service();
        service.default_apprentice().await.unwrap();
        let err = service.create_next_report().await.unwrap_err();
        assert!(matches!(err, ReportError::NoPreviousReport));
    }

    #[tokio::test]
    async fn stored_date_at_the_end_of_the_calendar_does_not_break_next_week() {
        let (service, store) = service();
        let apprentice = service.default_apprentice().await.unwrap();
        store
            .create_report(NewWeeklyReport {
                apprentice_id: apprentice.id,
                report_date: DateTime::<Utc>::MAX_UTC,
                raw_content: "Altbestand".to_string(),
            })
            .await
            .unwrap();

        let overview = service.overview().await.unwrap();
        assert_eq!(overview.total, 1);
        assert!(overview.suggested_next_date.is_none());

        let err = service.create_next_report().await.unwrap_err();
        assert!(matches!(err, ReportError::InvalidDate(_)));
        assert_eq!(service.list_reports().await.unwrap().len(), 1);
    }

    /// A store whose reads lag behind a concurrent writer: the latest report
    /// and the duplicate-date check both come from a stale snapshot.
    struct StaleReadStore {
        inner: Arc<InMemoryReportStore>,
        stale_latest: Option<WeeklyReport>,
    }

    #[async_trait]
    impl ReportStore for StaleReadStore {
        async fn find_default_apprentice(&self) -> PortResult<Option<Apprentice>> {
            self.inner.find_default_apprentice().await
        }
        async fn get_or_create_apprentice(
            &self,
            name: &str,
            email: &str,
        ) -> PortResult<Apprentice> {
            self.inner.get_or_create_apprentice(name, email).await
        }
        async fn get_apprentice_by_id(&self, apprentice_id: Uuid) -> PortResult<Apprentice> {
            self.inner.get_apprentice_by_id(apprentice_id).await
        }
        async fn get_report_by_id(&self, report_id: Uuid) -> PortResult<WeeklyReport> {
            self.inner.get_report_by_id(report_id).await
        }
        async fn find_report_by_date(
            &self,
            _apprentice_id: Uuid,
            _report_date: DateTime<Utc>,
            _excluding: Option<Uuid>,
        ) -> PortResult<Option<WeeklyReport>> {
            Ok(None)
        }
        async fn find_latest_report(
            &self,
            _apprentice_id: Uuid,
        ) -> PortResult<Option<WeeklyReport>> {
            Ok(self.stale_latest.clone())
        }
        async fn list_reports(&self, apprentice_id: Uuid) -> PortResult<Vec<WeeklyReport>> {
            self.inner.list_reports(apprentice_id).await
        }
        async fn create_report(&self, report: NewWeeklyReport) -> PortResult<WeeklyReport> {
            self.inner.create_report(report).await
        }
        async fn update_report_content(
            &self,
            report_id: Uuid,
            report_date: DateTime<Utc>,
            raw_content: &str,
        ) -> PortResult<WeeklyReport> {
            self.inner
                .update_report_content(report_id, report_date, raw_content)
                .await
        }
        async fn update_report_status(
            &self,
            report_id: Uuid,
            status: ReportStatus,
        ) -> PortResult<WeeklyReport> {
            self.inner.update_report_status(report_id, status).await
        }
        async fn update_report_ai_content(
            &self,
            report_id: Uuid,
            ai_content: &str,
        ) -> PortResult<WeeklyReport> {
            self.inner.update_report_ai_content(report_id, ai_content).await
        }
    }

    #[tokio::test]
    async fn create_next_fails_when_next_date_is_taken() {
        let store = Arc::new(InMemoryReportStore::new());
        let service = service_with(store.clone(), ScriptedImprover::answering("x"));
        let first = service.create_report(draft("2024-01-08", "A")).await.unwrap();
        service.create_next_report().await.unwrap();

        let lagging = ReportService::new(
            Arc::new(StaleReadStore {
                inner: store.clone(),
                stale_latest: Some(first.report),
            }),
            ScriptedImprover::answering("x"),
            ImprovePrompt::default(),
            ApprenticeProfile::default(),
        );
        let err = lagging.create_next_report().await.unwrap_err();

        assert!(matches!(err, ReportError::NextDateTaken(d) if d == date("2024-01-15")));
        assert_eq!(service.list_reports().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn store_conflict_after_passed_check_is_a_duplicate() {
        let store = Arc::new(InMemoryReportStore::new());
        let service = service_with(store.clone(), ScriptedImprover::answering("x"));
        service.create_report(draft("2024-01-08", "A")).await.unwrap();

        let lagging = ReportService::new(
            Arc::new(StaleReadStore {
                inner: store.clone(),
                stale_latest: None,
            }),
            ScriptedImprover::answering("x"),
            ImprovePrompt::default(),
            ApprenticeProfile::default(),
        );
        let err = lagging
            .create_report(draft("2024-01-08", "B"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::DuplicateDate(_)));
        assert_eq!(service.list_reports().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn improve_stores_ai_content_and_sends_prompt() {
        let store = Arc::new(InMemoryReportStore::new());
        let improver = ScriptedImprover::answering("Am Montag prüfte ich das Netzwerk.");
        let service = service_with(store, improver.clone());
        let created = service
            .create_report(draft("2024-01-08", "Montag: Netzwerk geprüft"))
            .await
            .unwrap();

        let improved = service.improve_report(created.report.id).await.unwrap();

        assert_eq!(improved.ai_content, "Am Montag prüfte ich das Netzwerk.");
        assert_eq!(
            improved.report.report.ai_content.as_deref(),
            Some("Am Montag prüfte ich das Netzwerk.")
        );
        assert_eq!(improved.report.report.raw_content, "Montag: Netzwerk geprüft");
        assert_eq!(improved.report.report.status, ReportStatus::Draft);

        let seen = improver.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, service.prompt().system);
        assert_eq!(seen[0].1, 3);
        assert_eq!(seen[0].2, "Montag: Netzwerk geprüft");
    }

    #[tokio::test]
    async fn improve_overwrites_previous_ai_content() {
        let store = Arc::new(InMemoryReportStore::new());
        let first = service_with(store.clone(), ScriptedImprover::answering("Erste Fassung"));
        let created = first.create_report(draft("2024-01-08", "A")).await.unwrap();
        first.improve_report(created.report.id).await.unwrap();

        let second = service_with(store.clone(), ScriptedImprover::answering("Zweite Fassung"));
        let improved = second.improve_report(created.report.id).await.unwrap();

        assert_eq!(improved.report.report.ai_content.as_deref(), Some("Zweite Fassung"));
    }

    #[tokio::test]
    async fn blank_ai_answer_leaves_report_untouched() {
        let store = Arc::new(InMemoryReportStore::new());
        let service = service_with(store.clone(), ScriptedImprover::answering("  \n"));
        let created = service.create_report(draft("2024-01-08", "A")).await.unwrap();

        let err = service.improve_report(created.report.id).await.unwrap_err();

        assert!(matches!(err, ReportError::EmptyAiResponse));
        let stored = store.get_report_by_id(created.report.id).await.unwrap();
        assert_eq!(stored, created.report);
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_without_retry() {
        let store = Arc::new(InMemoryReportStore::new());
        let improver = ScriptedImprover::failing("rate limited");
        let service = service_with(store.clone(), improver.clone());
        let created = service.create_report(draft("2024-01-08", "A")).await.unwrap();

        let err = service.improve_report(created.report.id).await.unwrap_err();

        assert!(matches!(err, ReportError::Port(PortError::Unexpected(_))));
        assert_eq!(improver.seen.lock().unwrap().len(), 1);
        let stored = store.get_report_by_id(created.report.id).await.unwrap();
        assert_eq!(stored.ai_content, None);
    }

    #[tokio::test]
    async fn improve_unknown_report_is_not_found() {
        let (service, _) = service();
        let err = service.improve_report(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ReportError::ReportNotFound(_)));
    }
}
