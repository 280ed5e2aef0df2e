use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::format::format_timestamp;
use crate::models::{BucketCounts, Id, SyncStream, User, UserInvoiceLedger};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub has_api_key: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastSynchronization {
    pub date: Option<DateTime<Utc>>,
    pub formatted: String,
    /// Watermark of every stream synced at least once.
    pub details: BTreeMap<SyncStream, DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynchronizedInvoiceCount {
    pub total: usize,
    pub breakdown: BucketCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Id,
    pub full_name: String,
    pub email: String,
}

/// Integration health for one user: credential, watermarks and ledger size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusReport {
    pub api_key_status: ApiKeyStatus,
    pub last_synchronization: LastSynchronization,
    pub synchronized_invoice_count: SynchronizedInvoiceCount,
    pub user: UserSummary,
    pub generated_at: DateTime<Utc>,
}

impl SyncStatusReport {
    pub fn compute(
        user: &User,
        ledger: Option<&UserInvoiceLedger>,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Self {
        let has_api_key = user.has_nes_api_key();
        let last = ledger.and_then(UserInvoiceLedger::last_synchronization);

        Self {
            api_key_status: ApiKeyStatus {
                has_api_key,
                message: if has_api_key {
                    "API anahtarı aktif".to_string()
                } else {
                    "API anahtarı tanımlanmamış".to_string()
                },
            },
            last_synchronization: LastSynchronization {
                date: last,
                formatted: match last {
                    Some(at) => format_timestamp(at, tz),
                    None => "Henüz senkronizasyon yapılmamış".to_string(),
                },
                details: ledger
                    .map(|l| l.last_synced_at.clone())
                    .unwrap_or_default(),
            },
            synchronized_invoice_count: SynchronizedInvoiceCount {
                total: ledger.map_or(0, |l| l.total_invoices),
                breakdown: ledger.map(UserInvoiceLedger::bucket_counts).unwrap_or_default(),
            },
            user: UserSummary {
                id: user.id.clone(),
                full_name: user.full_name.clone(),
                email: user.email.clone(),
            },
            generated_at: now,
        }
    }
}
