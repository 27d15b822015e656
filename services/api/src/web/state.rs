//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use berichtsheft_core::ReportService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Requests share no mutable state beyond what the store itself holds.
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportService>,
}

impl AppState {
    pub fn new(reports: Arc<ReportService>) -> Self {
        Self { reports }
    }
}
