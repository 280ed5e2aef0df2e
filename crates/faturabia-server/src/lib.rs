//! HTTP surface over the faturabia sync and reporting services.
//!
//! Authentication happens upstream; requests arrive with the caller's id in
//! the `x-user-id` header.

#[cfg(feature = "http")]
mod error;
#[cfg(feature = "http")]
mod routes;

#[cfg(feature = "http")]
pub use error::ApiError;
#[cfg(feature = "http")]
pub use routes::{build_router, UserId, USER_ID_HEADER};

use std::sync::Arc;

use anyhow::Result;
use faturabia::config::ResolvedConfig;
use faturabia::nesten::{InvoiceSourceFactory, NestenClientFactory};
use faturabia::stats::ReportService;
use faturabia::storage::{JsonFileStorage, Storage};
use faturabia::sync::{BackgroundJobs, InvoiceSyncService};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<InvoiceSyncService>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    pub fn new(sync: InvoiceSyncService, reports: ReportService) -> Self {
        Self {
            sync: Arc::new(sync),
            reports: Arc::new(reports),
        }
    }

    /// Wire storage and upstream client from a resolved config.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
        let sources: Arc<dyn InvoiceSourceFactory> =
            Arc::new(NestenClientFactory::new(config.nesten.clone())?);
        Self::with_parts(storage, sources, config)
    }

    pub fn with_parts(
        storage: Arc<dyn Storage>,
        sources: Arc<dyn InvoiceSourceFactory>,
        config: &ResolvedConfig,
    ) -> Result<Self> {
        let sync = InvoiceSyncService::new(Arc::clone(&storage), sources, config.nesten.clone());
        let reports = ReportService::new(storage, config.display.clone())?;
        Ok(Self::new(sync, reports))
    }

    pub fn jobs(&self) -> &BackgroundJobs {
        self.sync.jobs()
    }
}
