//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the report REST API and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use berichtsheft_core::domain::{parse_report_id, MonthGroup, YearGroup};
use berichtsheft_core::{
    Apprentice, ReportDraft, ReportError, ReportOverview, ReportWithApprentice, RequestedStatus,
    WeeklyReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_reports_handler,
        create_report_handler,
        update_report_handler,
        update_status_handler,
        improve_report_handler,
        create_next_report_handler,
        overview_handler,
    ),
    components(
        schemas(
            ReportPayload,
            StatusPayload,
            ApprenticeSummary,
            ReportResponse,
            ImproveResponse,
            CreateNextResponse,
            OverviewResponse,
            YearGroupResponse,
            MonthGroupResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Berichtsheft API", description = "Weekly training reports with optional AI rewriting.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// User-facing Messages
//=========================================================================================

const MSG_MISSING_FIELDS: &str = "Alle Felder sind erforderlich";
const MSG_INVALID_DATE: &str = "Ungültiges Datum";
const MSG_INVALID_REQUEST: &str = "Ungültige Anfrage";
const MSG_DUPLICATE_DATE: &str = "Für dieses Datum existiert bereits ein Berichtsheft";
const MSG_NEXT_DATE_TAKEN: &str = "Für das nächste Datum existiert bereits ein Berichtsheft";
const MSG_REPORT_NOT_FOUND: &str = "Berichtsheft nicht gefunden";
const MSG_INVALID_STATUS: &str = "Ungültiger Status";
const MSG_NO_APPRENTICE: &str = "Kein Azubi gefunden";
const MSG_NO_PREVIOUS_REPORT: &str =
    "Kein Bericht gefunden. Bitte erstellen Sie zuerst einen Bericht manuell.";
const MSG_NEXT_REPORT_CREATED: &str = "Nächster Bericht wurde automatisch erstellt";

const FAIL_LIST: &str = "Fehler beim Laden der Berichtshefte";
const FAIL_CREATE: &str = "Fehler beim Erstellen des Berichtshefts";
const FAIL_UPDATE: &str = "Fehler beim Aktualisieren des Berichtshefts";
const FAIL_STATUS: &str = "Fehler beim Aktualisieren des Status";
const FAIL_IMPROVE: &str = "Fehler bei der KI-Verbesserung des Berichtshefts";
const FAIL_CREATE_NEXT: &str = "Fehler beim automatischen Erstellen des nächsten Berichts";
const FAIL_OVERVIEW: &str = "Fehler beim Laden der Übersicht";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Body of `POST /reports` and `PATCH /reports/{id}`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub report_date: Option<String>,
    pub raw_content: Option<String>,
}

/// Body of `PATCH /reports/{id}/status`.
#[derive(Deserialize, ToSchema)]
pub struct StatusPayload {
    /// One of `DRAFT`, `SUBMITTED` or the legacy `COMPLETED`.
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApprenticeSummary {
    pub name: String,
    pub email: String,
}

/// A report joined with its apprentice's name and email.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub apprentice_id: Uuid,
    pub report_date: DateTime<Utc>,
    pub raw_content: String,
    pub ai_content: Option<String>,
    /// `DRAFT` or `SUBMITTED`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub apprentice: ApprenticeSummary,
}

impl ReportResponse {
    fn new(report: WeeklyReport, apprentice: &Apprentice) -> Self {
        Self {
            id: report.id,
            apprentice_id: report.apprentice_id,
            report_date: report.report_date,
            raw_content: report.raw_content,
            ai_content: report.ai_content,
            status: report.status.as_str().to_string(),
            created_at: report.created_at,
            apprentice: ApprenticeSummary {
                name: apprentice.name.clone(),
                email: apprentice.email.clone(),
            },
        }
    }
}

impl From<ReportWithApprentice> for ReportResponse {
    fn from(joined: ReportWithApprentice) -> Self {
        Self::new(joined.report, &joined.apprentice)
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImproveResponse {
    pub ai_content: String,
    pub report: ReportResponse,
}

#[derive(Serialize, ToSchema)]
pub struct CreateNextResponse {
    pub report: ReportResponse,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct MonthGroupResponse {
    pub month: u32,
    pub reports: Vec<ReportResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct YearGroupResponse {
    pub year: i32,
    pub months: Vec<MonthGroupResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total: usize,
    pub open: usize,
    pub submitted: usize,
    pub last_report_date: Option<DateTime<Utc>>,
    pub suggested_next_date: Option<DateTime<Utc>>,
    pub years: Vec<YearGroupResponse>,
}

impl From<ReportOverview> for OverviewResponse {
    fn from(overview: ReportOverview) -> Self {
        let apprentice = overview.apprentice;
        let years = overview
            .years
            .into_iter()
            .map(|YearGroup { year, months }| YearGroupResponse {
                year,
                months: months
                    .into_iter()
                    .map(|MonthGroup { month, reports }| MonthGroupResponse {
                        month,
                        reports: reports
                            .into_iter()
                            .map(|r| ReportResponse::new(r, &apprentice))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            total: overview.total,
            open: overview.open,
            submitted: overview.submitted,
            last_report_date: overview.last_report_date,
            suggested_next_date: overview.suggested_next_date,
            years,
        }
    }
}

/// The body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: &str) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Maps a service error to its status and German message. Anything that is
/// not the caller's fault is logged and reported with `failure`.
fn report_error(err: ReportError, failure: &str) -> HandlerError {
    match err {
        ReportError::MissingFields => error_response(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS),
        ReportError::InvalidDate(_) => error_response(StatusCode::BAD_REQUEST, MSG_INVALID_DATE),
        ReportError::InvalidStatus(_) => {
            error_response(StatusCode::BAD_REQUEST, MSG_INVALID_STATUS)
        }
        ReportError::DuplicateDate(_) => {
            error_response(StatusCode::BAD_REQUEST, MSG_DUPLICATE_DATE)
        }
        ReportError::NextDateTaken(_) => {
            error_response(StatusCode::BAD_REQUEST, MSG_NEXT_DATE_TAKEN)
        }
        ReportError::ReportNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, MSG_REPORT_NOT_FOUND)
        }
        ReportError::NoApprentice => error_response(StatusCode::NOT_FOUND, MSG_NO_APPRENTICE),
        ReportError::NoPreviousReport => {
            error_response(StatusCode::NOT_FOUND, MSG_NO_PREVIOUS_REPORT)
        }
        ReportError::EmptyAiResponse | ReportError::Port(_) => {
            error!("{}: {:?}", failure, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
    }
}

fn json_error(rejection: JsonRejection) -> HandlerError {
    warn!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, MSG_INVALID_REQUEST)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List all reports of the apprentice, newest created first.
#[utoipa::path(
    get,
    path = "/reports",
    responses(
        (status = 200, description = "Reports of the apprentice", body = [ReportResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_reports_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let reports = app_state
        .reports
        .list_reports()
        .await
        .map_err(|e| report_error(e, FAIL_LIST))?;

    let body: Vec<ReportResponse> = reports.into_iter().map(ReportResponse::from).collect();
    Ok(Json(body))
}

/// Create a report for the given date.
#[utoipa::path(
    post,
    path = "/reports",
    request_body = ReportPayload,
    responses(
        (status = 201, description = "Report created", body = ReportResponse),
        (status = 400, description = "Missing fields, invalid date or duplicate date", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_report_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload.map_err(json_error)?;
    let draft = ReportDraft::parse(payload.report_date.as_deref(), payload.raw_content.as_deref())
        .map_err(|e| report_error(e, FAIL_CREATE))?;

    let created = app_state
        .reports
        .create_report(draft)
        .await
        .map_err(|e| report_error(e, FAIL_CREATE))?;

    info!(
        "Created report {} dated {}",
        created.report.id, created.report.report_date
    );
    Ok((StatusCode::CREATED, Json(ReportResponse::from(created))))
}

/// Replace the date and raw content of a report.
#[utoipa::path(
    patch,
    path = "/reports/{id}",
    request_body = ReportPayload,
    params(
        ("id" = Uuid, Path, description = "The report to edit.")
    ),
    responses(
        (status = 200, description = "Report updated", body = ReportResponse),
        (status = 400, description = "Missing fields, invalid date or duplicate date", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload.map_err(json_error)?;
    let draft = ReportDraft::parse(payload.report_date.as_deref(), payload.raw_content.as_deref())
        .map_err(|e| report_error(e, FAIL_UPDATE))?;
    let report_id = parse_report_id(&id).map_err(|e| report_error(e, FAIL_UPDATE))?;

    let updated = app_state
        .reports
        .update_report(report_id, draft)
        .await
        .map_err(|e| report_error(e, FAIL_UPDATE))?;

    info!("Updated report {}", report_id);
    Ok(Json(ReportResponse::from(updated)))
}

/// Set the status of a report. `COMPLETED` is stored as `DRAFT`.
#[utoipa::path(
    patch,
    path = "/reports/{id}/status",
    request_body = StatusPayload,
    params(
        ("id" = Uuid, Path, description = "The report whose status changes.")
    ),
    responses(
        (status = 200, description = "Status updated", body = ReportResponse),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusPayload>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload.map_err(json_error)?;
    let requested = payload
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<RequestedStatus>()
        .map_err(|e| report_error(e, FAIL_STATUS))?;
    let report_id = parse_report_id(&id).map_err(|e| report_error(e, FAIL_STATUS))?;

    let updated = app_state
        .reports
        .set_status(report_id, requested)
        .await
        .map_err(|e| report_error(e, FAIL_STATUS))?;

    info!("Report {} is now {}", report_id, updated.report.status);
    Ok(Json(ReportResponse::from(updated)))
}

/// Rewrite the raw content with the LLM and store the result as `aiContent`.
#[utoipa::path(
    post,
    path = "/reports/{id}/improve",
    params(
        ("id" = Uuid, Path, description = "The report to improve.")
    ),
    responses(
        (status = 200, description = "Improved text stored", body = ImproveResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "AI request failed or returned no text", body = ErrorResponse)
    )
)]
pub async fn improve_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let report_id = parse_report_id(&id).map_err(|e| report_error(e, FAIL_IMPROVE))?;

    let improved = app_state
        .reports
        .improve_report(report_id)
        .await
        .map_err(|e| report_error(e, FAIL_IMPROVE))?;

    info!(
        "Stored AI content for report {} using prompt '{}'",
        report_id,
        app_state.reports.prompt().name
    );
    Ok(Json(ImproveResponse {
        ai_content: improved.ai_content,
        report: ReportResponse::from(improved.report),
    }))
}

/// Create the report one week after the latest one, with placeholder content.
#[utoipa::path(
    post,
    path = "/reports/create-next",
    responses(
        (status = 200, description = "Next report created", body = CreateNextResponse),
        (status = 400, description = "A report already exists for the next date", body = ErrorResponse),
        (status = 404, description = "No apprentice or no previous report", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_next_report_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let created = app_state
        .reports
        .create_next_report()
        .await
        .map_err(|e| report_error(e, FAIL_CREATE_NEXT))?;

    info!(
        "Created report {} dated {} following {}",
        created.report.report.id, created.report.report.report_date, created.previous_report_date
    );
    Ok(Json(CreateNextResponse {
        report: ReportResponse::from(created.report),
        message: MSG_NEXT_REPORT_CREATED.to_string(),
    }))
}

/// Counters and a year/month archive of the apprentice's reports.
#[utoipa::path(
    get,
    path = "/reports/overview",
    responses(
        (status = 200, description = "Report overview", body = OverviewResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn overview_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let overview = app_state
        .reports
        .overview()
        .await
        .map_err(|e| report_error(e, FAIL_OVERVIEW))?;

    Ok(Json(OverviewResponse::from(overview)))
}
