pub mod rest;
pub mod state;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

pub use rest::{
    create_next_report_handler, create_report_handler, improve_report_handler,
    list_reports_handler, overview_handler, update_report_handler, update_status_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the report routes. Layers (CORS, tracing, Swagger UI) are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/reports", get(list_reports_handler).post(create_report_handler))
        .route("/reports/overview", get(overview_handler))
        .route("/reports/create-next", post(create_next_report_handler))
        .route("/reports/{id}", patch(update_report_handler))
        .route("/reports/{id}/status", patch(update_status_handler))
        .route("/reports/{id}/improve", post(improve_report_handler))
        .with_state(app_state)
}
