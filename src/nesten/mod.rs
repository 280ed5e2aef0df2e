//! Client side of the Nesten e-Invoice / e-Archive API.

#[cfg(feature = "nesten")]
mod client;
mod pagination;
mod window;

#[cfg(feature = "nesten")]
pub use client::{NestenClient, NestenClientFactory};
pub use pagination::fetch_all_pages;
pub use window::SyncWindow;

use std::sync::Arc;

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use crate::config::NestenConfig;
use crate::error::SyncError;
use crate::models::SyncStream;

/// Which upstream API a collection lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    EInvoice,
    EArchive,
}

impl SyncStream {
    pub fn api(self) -> Api {
        match self {
            SyncStream::Incoming | SyncStream::Outgoing | SyncStream::Drafts => Api::EInvoice,
            SyncStream::Archived | SyncStream::ArchivedDrafts => Api::EArchive,
        }
    }

    /// Path below the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            SyncStream::Incoming => "/incoming/invoices",
            SyncStream::Outgoing => "/outgoing/invoices",
            SyncStream::Drafts => "/outgoing/invoices/drafts",
            SyncStream::Archived => "/invoices",
            SyncStream::ArchivedDrafts => "/invoices/drafts",
        }
    }

    /// Whether the collection accepts a `startDate`/`endDate` window.
    pub fn is_dated(self) -> bool {
        !self.is_draft()
    }
}

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: String,
    pub window: Option<SyncWindow>,
    pub extra_filters: Vec<(String, String)>,
}

impl PageRequest {
    /// Query string pairs in the order the API documents them.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
            ("sort".to_string(), self.sort.clone()),
        ];
        if let Some(window) = &self.window {
            query.push(("startDate".to_string(), window.start_param()));
            query.push(("endDate".to_string(), window.end_param()));
        }
        query.extend(self.extra_filters.iter().cloned());
        query
    }
}

/// One page of a collection: `{ "data": [...], "totalCount": n }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoicePage {
    #[serde(rename = "data")]
    pub records: Vec<Value>,
    pub total_count: u64,
}

/// Settings for a full-collection fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub page_size: u32,
    pub sort: String,
    /// Ignored for draft collections.
    pub window: Option<SyncWindow>,
    pub extra_filters: Vec<(String, String)>,
    /// Later pages in flight at once.
    pub concurrency: usize,
    /// Pages fetched at most, page 1 included.
    pub max_pages: u32,
}

impl FetchOptions {
    pub fn from_config(config: &NestenConfig) -> Self {
        Self {
            page_size: config.effective_page_size(),
            concurrency: config.effective_page_concurrency(),
            max_pages: config.effective_max_pages(),
            sort: config.sort.clone(),
            window: None,
            extra_filters: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: SyncWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_filters.push((key.into(), value.into()));
        self
    }
}

/// Paginated access to the five invoice collections of one account.
///
/// Implementations perform no retries.
#[async_trait::async_trait]
pub trait InvoiceSource: Send + Sync {
    async fn fetch_page(
        &self,
        stream: SyncStream,
        request: &PageRequest,
    ) -> Result<InvoicePage, SyncError>;

    /// Every page of a collection. Only a failure of the first page is an error.
    async fn fetch_all(
        &self,
        stream: SyncStream,
        options: &FetchOptions,
    ) -> Result<Vec<Value>, SyncError> {
        fetch_all_pages(self, stream, options).await
    }
}

/// Builds an [`InvoiceSource`] authenticated with one user's API key.
pub trait InvoiceSourceFactory: Send + Sync {
    fn create(&self, api_key: SecretString) -> anyhow::Result<Arc<dyn InvoiceSource>>;
}
