//! One synchronization pass over all five collections of a user.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::NestenConfig;
use crate::error::SyncError;
use crate::models::{Id, SyncStream, UserInvoiceLedger};
use crate::nesten::{FetchOptions, InvoiceSource, InvoiceSourceFactory, SyncWindow};
use crate::stats::compute_statistics;
use crate::storage::Storage;

use super::customers::CustomerExtractor;
use super::jobs::BackgroundJobs;
use super::locks::UserLocks;
use super::merge::merge_into;

/// Result of one collection within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CollectionOutcome {
    Fetched {
        fetched: usize,
        new: usize,
        updated: usize,
        skipped: usize,
    },
    Failed {
        error: String,
    },
}

impl CollectionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CollectionOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub fetched: usize,
    pub new: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionError {
    pub collection: SyncStream,
    pub message: String,
}

/// What a fetch-all pass did. Returned even when every collection failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAllSummary {
    pub user_id: Id,
    pub synced_at: DateTime<Utc>,
    pub collections: BTreeMap<SyncStream, CollectionOutcome>,
    pub totals: SummaryTotals,
    pub errors: Vec<CollectionError>,
    /// Ledger size after the pass.
    pub total_invoices: usize,
}

impl FetchAllSummary {
    pub fn outcome(&self, stream: SyncStream) -> Option<&CollectionOutcome> {
        self.collections.get(&stream)
    }

    pub fn all_failed(&self) -> bool {
        self.collections.values().all(CollectionOutcome::is_failed)
    }
}

/// Drives fetch, merge and persistence for one user at a time.
pub struct InvoiceSyncService {
    storage: Arc<dyn Storage>,
    sources: Arc<dyn InvoiceSourceFactory>,
    config: NestenConfig,
    clock: Arc<dyn Clock>,
    jobs: BackgroundJobs,
    locks: Arc<UserLocks>,
}

impl InvoiceSyncService {
    pub fn new(
        storage: Arc<dyn Storage>,
        sources: Arc<dyn InvoiceSourceFactory>,
        config: NestenConfig,
    ) -> Self {
        Self {
            storage,
            sources,
            config,
            clock: Arc::new(SystemClock),
            jobs: BackgroundJobs::new(),
            locks: Arc::new(UserLocks::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_jobs(mut self, jobs: BackgroundJobs) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn jobs(&self) -> &BackgroundJobs {
        &self.jobs
    }

    /// Fetch all five collections, merge them into the ledger and persist it.
    ///
    /// Collection failures are reported in the summary. Only a missing user,
    /// a missing API key, or a storage failure is an error.
    pub async fn fetch_all(&self, user_id: &Id) -> Result<FetchAllSummary, SyncError> {
        let user = self
            .storage
            .get_user(user_id)
            .await
            .map_err(SyncError::Persistence)?
            .ok_or_else(|| SyncError::UserNotFound(user_id.clone()))?;
        let api_key = user
            .nes_api_key()
            .ok_or_else(|| SyncError::MissingCredential(user_id.clone()))?;
        let source = self
            .sources
            .create(api_key)
            .map_err(|e| SyncError::Transport(format!("{e:#}")))?;

        let _guard = self.locks.acquire(user_id).await;

        let now = self.clock.now();
        let mut ledger = self
            .storage
            .get_ledger(user_id)
            .await
            .map_err(SyncError::Persistence)?
            .unwrap_or_else(|| UserInvoiceLedger::new(user_id.clone(), now));

        info!(user_id = %user_id, "starting fetch-all pass");

        let [incoming, outgoing, drafts, archived, archived_drafts] =
            SyncStream::ALL.map(|stream| {
                let options = self.options_for(&ledger, stream);
                self.fetch_stream(source.as_ref(), stream, options)
            });
        let results = tokio::join!(incoming, outgoing, drafts, archived, archived_drafts);
        let results = [results.0, results.1, results.2, results.3, results.4];

        let mut collections = BTreeMap::new();
        let mut totals = SummaryTotals::default();
        let mut errors = Vec::new();
        let mut fetched_records: Vec<Value> = Vec::new();

        for (stream, result) in results {
            match result {
                Ok(records) => {
                    let fetched = records.len();
                    fetched_records.extend(records.iter().cloned());

                    let (category, kind) = stream.destination();
                    let merged = merge_into(ledger.bucket_mut(category, kind), records);
                    ledger.set_watermark(stream, now);

                    info!(
                        user_id = %user_id,
                        %stream,
                        fetched,
                        new = merged.new,
                        updated = merged.updated,
                        "collection merged"
                    );
                    totals.fetched += fetched;
                    totals.new += merged.new;
                    totals.updated += merged.updated;
                    collections.insert(
                        stream,
                        CollectionOutcome::Fetched {
                            fetched,
                            new: merged.new,
                            updated: merged.updated,
                            skipped: merged.skipped,
                        },
                    );
                }
                Err(err) => {
                    warn!(user_id = %user_id, %stream, error = %err, "collection fetch failed");
                    errors.push(CollectionError {
                        collection: stream,
                        message: err.to_string(),
                    });
                    collections.insert(
                        stream,
                        CollectionOutcome::Failed {
                            error: err.to_string(),
                        },
                    );
                }
            }
        }

        ledger.cached_statistics = Some(compute_statistics(&ledger, now));
        ledger.touch(now);
        self.storage
            .save_ledger(&mut ledger)
            .await
            .map_err(SyncError::Persistence)?;

        if errors.len() < SyncStream::ALL.len() {
            self.enqueue_customer_pass(user_id.clone(), fetched_records);
        }

        info!(
            user_id = %user_id,
            fetched = totals.fetched,
            new = totals.new,
            updated = totals.updated,
            failed = errors.len(),
            total_invoices = ledger.total_invoices,
            "fetch-all pass finished"
        );

        Ok(FetchAllSummary {
            user_id: user_id.clone(),
            synced_at: now,
            collections,
            totals,
            errors,
            total_invoices: ledger.total_invoices,
        })
    }

    fn options_for(&self, ledger: &UserInvoiceLedger, stream: SyncStream) -> FetchOptions {
        let options = FetchOptions::from_config(&self.config);
        if !stream.is_dated() {
            return options;
        }
        options.with_window(SyncWindow::compute(
            ledger.watermark(stream),
            self.config.sync_overlap,
            self.config.epoch_start,
            self.clock.tomorrow(),
        ))
    }

    async fn fetch_stream(
        &self,
        source: &dyn InvoiceSource,
        stream: SyncStream,
        options: FetchOptions,
    ) -> (SyncStream, Result<Vec<Value>, SyncError>) {
        (stream, source.fetch_all(stream, &options).await)
    }

    /// Customer extraction followed by the invoice-count rollup, detached
    /// from the request. Holds the user's lock like a fetch-all pass.
    fn enqueue_customer_pass(&self, user_id: Id, records: Vec<Value>) {
        let extractor = CustomerExtractor::new(Arc::clone(&self.storage), Arc::clone(&self.clock));
        let locks = Arc::clone(&self.locks);
        self.jobs.spawn(format!("customers:{user_id}"), async move {
            let _guard = locks.acquire(&user_id).await;
            extractor.extract(&user_id, &records).await?;
            extractor.update_invoice_counts(&user_id).await?;
            Ok(())
        });
    }
}
