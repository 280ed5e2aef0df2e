use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate snapshot stored on the ledger after each fetch-all pass.
///
/// Recomputed wholesale every pass; never updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatistics {
    pub total_invoices: usize,
    pub incoming_count: usize,
    pub outgoing_count: usize,
    pub draft_count: usize,
    /// Amounts are decimal strings rounded to cents.
    pub incoming_amount: Decimal,
    pub outgoing_amount: Decimal,
    pub total_amount: Decimal,
    pub profit_loss: Decimal,
    pub calculated_at: DateTime<Utc>,
}
