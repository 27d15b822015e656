pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod prompt;
pub mod service;

pub use domain::{
    Apprentice, ApprenticeProfile, ReportDraft, ReportOverview, ReportStatus, ReportWithApprentice,
    RequestedStatus, WeeklyReport,
};
pub use error::{ReportError, ReportResult};
pub use memory::InMemoryReportStore;
pub use ports::{ImproveRequest, PortError, PortResult, ReportStore, TextImprovementService};
pub use prompt::{ImprovePrompt, PromptExample};
pub use service::{CreatedNextReport, ImprovedReport, ReportService};
