//! crates/berichtsheft_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::error::ReportError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, SubsecRound, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of days between two consecutive weekly reports.
pub const REPORT_INTERVAL_DAYS: i64 = 7;

/// The person who owns a sequence of weekly reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apprentice {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Name and email used when the implicit apprentice has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprenticeProfile {
    pub name: String,
    pub email: String,
}

impl Default for ApprenticeProfile {
    fn default() -> Self {
        Self {
            name: "Demo Azubi".to_string(),
            email: "demo@azubi.de".to_string(),
        }
    }
}

//=========================================================================================
// Report Status
//=========================================================================================

/// The two live lifecycle states of a stored report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportStatus {
    #[default]
    Draft,
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "DRAFT",
            ReportStatus::Submitted => "SUBMITTED",
        }
    }

    /// Advances one step in the DRAFT -> SUBMITTED -> DRAFT cycle.
    pub fn next(self) -> Self {
        match self {
            ReportStatus::Draft => ReportStatus::Submitted,
            ReportStatus::Submitted => ReportStatus::Draft,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of a stored status. Legacy values are not accepted here.
impl FromStr for ReportStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ReportStatus::Draft),
            "SUBMITTED" => Ok(ReportStatus::Submitted),
            other => Err(ReportError::InvalidStatus(other.to_string())),
        }
    }
}

/// A status as requested by a client. `Completed` is a legacy value that is
/// accepted on input and always collapsed to `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedStatus {
    Draft,
    Submitted,
    Completed,
}

impl RequestedStatus {
    pub fn normalize(self) -> ReportStatus {
        match self {
            RequestedStatus::Draft | RequestedStatus::Completed => ReportStatus::Draft,
            RequestedStatus::Submitted => ReportStatus::Submitted,
        }
    }

    /// The status a toggle switches to from this one.
    pub fn toggled(self) -> ReportStatus {
        self.normalize().next()
    }
}

impl FromStr for RequestedStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(RequestedStatus::Draft),
            "SUBMITTED" => Ok(RequestedStatus::Submitted),
            "COMPLETED" => Ok(RequestedStatus::Completed),
            other => Err(ReportError::InvalidStatus(other.to_string())),
        }
    }
}

impl From<ReportStatus> for RequestedStatus {
    fn from(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Draft => RequestedStatus::Draft,
            ReportStatus::Submitted => RequestedStatus::Submitted,
        }
    }
}

//=========================================================================================
// Weekly Reports
//=========================================================================================

/// One dated entry containing raw user text and optional machine-improved text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub apprentice_id: Uuid,
    pub report_date: DateTime<Utc>,
    pub raw_content: String,
    pub ai_content: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// A report joined with its owning apprentice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWithApprentice {
    pub report: WeeklyReport,
    pub apprentice: Apprentice,
}

/// The fields a store needs to insert a report. Status starts as `Draft`
/// and `created_at` is stamped by the store.
#[derive(Debug, Clone)]
pub struct NewWeeklyReport {
    pub apprentice_id: Uuid,
    pub report_date: DateTime<Utc>,
    pub raw_content: String,
}

/// A validated date/content pair for creating or editing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    pub report_date: DateTime<Utc>,
    pub raw_content: String,
}

impl ReportDraft {
    /// Both fields are required and must be non-empty.
    pub fn parse(
        report_date: Option<&str>,
        raw_content: Option<&str>,
    ) -> Result<Self, ReportError> {
        let (Some(report_date), Some(raw_content)) = (
            report_date.filter(|s| !s.is_empty()),
            raw_content.filter(|s| !s.is_empty()),
        ) else {
            return Err(ReportError::MissingFields);
        };

        Ok(Self {
            report_date: parse_report_date(report_date)?,
            raw_content: raw_content.to_string(),
        })
    }
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
///
/// Timestamps keep their time of day, so two values that differ only in time
/// of day are distinct report dates. Sub-microsecond digits are dropped to
/// match what Postgres stores. A date with no representable following week
/// is rejected.
pub fn parse_report_date(input: &str) -> Result<DateTime<Utc>, ReportError> {
    let input = input.trim();
    let parsed = match DateTime::parse_from_rfc3339(input) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc).trunc_subsecs(6)),
        Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Utc.from_utc_datetime(&midnight)),
    };

    parsed
        .filter(|date| next_report_date(*date).is_some())
        .ok_or_else(|| ReportError::InvalidDate(input.to_string()))
}

/// Report ids are UUIDs; anything else cannot name an existing report.
pub fn parse_report_id(input: &str) -> Result<Uuid, ReportError> {
    Uuid::parse_str(input).map_err(|_| ReportError::ReportNotFound(input.to_string()))
}

/// The date of the report following `previous`, or `None` past chrono's range.
pub fn next_report_date(previous: DateTime<Utc>) -> Option<DateTime<Utc>> {
    previous.checked_add_signed(Duration::days(REPORT_INTERVAL_DAYS))
}

/// Formats a date the way German users write it, e.g. `8.1.2024`.
pub fn format_german_date(date: DateTime<Utc>) -> String {
    date.format("%-d.%-m.%Y").to_string()
}

/// Placeholder content for a report created by "create next".
pub fn next_report_placeholder(previous: DateTime<Utc>, next: DateTime<Utc>) -> String {
    format!(
        "Hier kommt dein Berichtsheft-Inhalt für die Woche vom {} bis {}...",
        format_german_date(previous),
        format_german_date(next)
    )
}

//=========================================================================================
// Overview
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGroup {
    pub month: u32,
    pub reports: Vec<WeeklyReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGroup {
    pub year: i32,
    pub months: Vec<MonthGroup>,
}

/// Counters and a year/month archive of one apprentice's reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOverview {
    pub apprentice: Apprentice,
    pub total: usize,
    pub open: usize,
    pub submitted: usize,
    pub last_report_date: Option<DateTime<Utc>>,
    pub suggested_next_date: Option<DateTime<Utc>>,
    /// Newest year first, newest month first, newest report first.
    pub years: Vec<YearGroup>,
}

impl ReportOverview {
    pub fn build(apprentice: Apprentice, reports: Vec<WeeklyReport>) -> Self {
        let total = reports.len();
        let submitted = reports
            .iter()
            .filter(|r| r.status == ReportStatus::Submitted)
            .count();
        let last_report_date = reports.iter().map(|r| r.report_date).max();

        let mut grouped: BTreeMap<i32, BTreeMap<u32, Vec<WeeklyReport>>> = BTreeMap::new();
        for report in reports {
            grouped
                .entry(report.report_date.year())
                .or_default()
                .entry(report.report_date.month())
                .or_default()
                .push(report);
        }

        let years = grouped
            .into_iter()
            .rev()
            .map(|(year, months)| YearGroup {
                year,
                months: months
                    .into_iter()
                    .rev()
                    .map(|(month, mut reports)| {
                        reports.sort_by(|a, b| b.report_date.cmp(&a.report_date));
                        MonthGroup { month, reports }
                    })
                    .collect(),
            })
            .collect();

        Self {
            apprentice,
            total,
            open: total - submitted,
            submitted,
            last_report_date,
            suggested_next_date: last_report_date.and_then(next_report_date),
            years,
        }
    }
}
