//! Read-side aggregation over synchronized ledgers.

mod dashboard;
mod metrics;
pub mod money;
mod status;

pub use dashboard::{
    DashboardData, DashboardStatistics, FinancialMetrics, KpiIndicators, Metric,
    RevenueExpenseComparison, SeriesAnalysis,
};
pub use metrics::{
    compute_statistics, customer_segments, estimated_collection_rate, growth_rate,
    CustomerSegment, LedgerTotals, MonthlySeries, SERIES_MONTHS,
};
pub use status::{
    ApiKeyStatus, LastSynchronization, SyncStatusReport, SynchronizedInvoiceCount, UserSummary,
};

use std::sync::Arc;

use anyhow::Result;
use chrono_tz::Tz;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::DisplayConfig;
use crate::error::SyncError;
use crate::models::{Customer, Id, InvoiceRecord, InvoiceStatistics, User, UserInvoiceLedger};
use crate::storage::Storage;
use crate::sync::customer_invoices;

/// A customer with the invoices that reference it.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerInvoices {
    pub customer: Customer,
    pub invoices: Vec<InvoiceRecord>,
}

/// Loads persisted data and runs the aggregations for the HTTP and CLI surfaces.
pub struct ReportService {
    storage: Arc<dyn Storage>,
    display: DisplayConfig,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(storage: Arc<dyn Storage>, display: DisplayConfig) -> Result<Self> {
        let tz = display.tz()?;
        Ok(Self {
            storage,
            display,
            tz,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn user(&self, user_id: &Id) -> Result<User, SyncError> {
        self.storage
            .get_user(user_id)
            .await
            .map_err(SyncError::Persistence)?
            .ok_or_else(|| SyncError::UserNotFound(user_id.clone()))
    }

    async fn ledger(&self, user_id: &Id) -> Result<Option<UserInvoiceLedger>, SyncError> {
        self.storage
            .get_ledger(user_id)
            .await
            .map_err(SyncError::Persistence)
    }

    /// The statistics cached by the last pass, or a fresh computation when
    /// none is cached.
    pub async fn statistics(&self, user_id: &Id) -> Result<InvoiceStatistics, SyncError> {
        self.user(user_id).await?;
        let now = self.clock.now();
        let stats = match self.ledger(user_id).await? {
            Some(ledger) => ledger
                .cached_statistics
                .clone()
                .unwrap_or_else(|| compute_statistics(&ledger, now)),
            None => compute_statistics(&UserInvoiceLedger::new(user_id.clone(), now), now),
        };
        Ok(stats)
    }

    pub async fn dashboard(&self, user_id: &Id) -> Result<DashboardData, SyncError> {
        let user = self.user(user_id).await?;
        let now = self.clock.now();
        let Some(ledger) = self.ledger(user_id).await? else {
            return Ok(DashboardData::empty(&self.display, now));
        };
        let customers = self
            .storage
            .list_customers(&user.customers)
            .await
            .map_err(SyncError::Persistence)?;
        Ok(DashboardData::compute(
            &ledger,
            &customers,
            &self.display,
            self.tz,
            now,
        ))
    }

    pub async fn status(&self, user_id: &Id) -> Result<SyncStatusReport, SyncError> {
        let user = self.user(user_id).await?;
        let ledger = self.ledger(user_id).await?;
        Ok(SyncStatusReport::compute(
            &user,
            ledger.as_ref(),
            self.tz,
            self.clock.now(),
        ))
    }

    /// Invoices of one of the user's customers, newest first.
    pub async fn customer_invoices(
        &self,
        user_id: &Id,
        customer_id: &Id,
    ) -> Result<CustomerInvoices, SyncError> {
        let user = self.user(user_id).await?;
        if !user.customers.contains(customer_id) {
            return Err(SyncError::CustomerNotFound(customer_id.clone()));
        }
        let customer = self
            .storage
            .get_customer(customer_id)
            .await
            .map_err(SyncError::Persistence)?
            .ok_or_else(|| SyncError::CustomerNotFound(customer_id.clone()))?;

        let invoices = match self.ledger(user_id).await? {
            Some(ledger) => customer_invoices(&ledger, &customer)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(CustomerInvoices { customer, invoices })
    }
}
