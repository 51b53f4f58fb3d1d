use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::ExamCatalogService;
use crate::error::AppServicesError;
use crate::sessions::ExamSessionService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<ExamCatalogService>,
    sessions: Arc<ExamSessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "storage ready");
        Ok(Self::from_storage(clock, &storage))
    }

    /// Build services over volatile in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(clock, &Storage::in_memory())
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        let catalog = Arc::new(ExamCatalogService::from_storage(clock, storage));
        let sessions = Arc::new(ExamSessionService::new(clock, Arc::clone(&catalog)));
        Self { catalog, sessions }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ExamCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.sessions)
    }
}
