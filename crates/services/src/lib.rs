#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod import;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use catalog_service::{DashboardStats, ExamCatalogService, ExamQuery, ExamSort, UnknownSort};
pub use error::{AppServicesError, CatalogError, ImportError, SessionError};
pub use import::{ImportedQuestion, import_questions, parse_questions};

pub use sessions::{
    CountdownDriver, CountdownThresholds, ExamSessionService, QuestionReview, ResultsReport,
    SubmitOutcome, TickOutcome, TimerStatus, format_countdown, format_duration,
};
