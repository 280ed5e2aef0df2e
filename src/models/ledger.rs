use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Id, InvoiceRecord, InvoiceStatistics, SOURCE_ID_FIELD};

/// Top-level ledger category: e-Invoice ("standard") or e-Archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceCategory {
    Standard,
    Archived,
}

impl InvoiceCategory {
    pub const ALL: [InvoiceCategory; 2] = [InvoiceCategory::Standard, InvoiceCategory::Archived];
}

/// Direction of money for aggregation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Incoming,
    Outgoing,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketKind {
    Incoming,
    Outgoing,
    IncomingDraft,
    OutgoingDraft,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Incoming,
        BucketKind::Outgoing,
        BucketKind::IncomingDraft,
        BucketKind::OutgoingDraft,
    ];

    pub fn flow(self) -> Flow {
        match self {
            BucketKind::Incoming => Flow::Incoming,
            BucketKind::Outgoing => Flow::Outgoing,
            BucketKind::IncomingDraft | BucketKind::OutgoingDraft => Flow::Draft,
        }
    }
}

/// One of the five independently synchronized upstream collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStream {
    Incoming,
    Outgoing,
    Drafts,
    Archived,
    ArchivedDrafts,
}

impl SyncStream {
    pub const ALL: [SyncStream; 5] = [
        SyncStream::Incoming,
        SyncStream::Outgoing,
        SyncStream::Drafts,
        SyncStream::Archived,
        SyncStream::ArchivedDrafts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStream::Incoming => "incoming",
            SyncStream::Outgoing => "outgoing",
            SyncStream::Drafts => "drafts",
            SyncStream::Archived => "archived",
            SyncStream::ArchivedDrafts => "archivedDrafts",
        }
    }

    /// Ledger bucket that receives this stream's records.
    pub fn destination(self) -> (InvoiceCategory, BucketKind) {
        match self {
            SyncStream::Incoming => (InvoiceCategory::Standard, BucketKind::Incoming),
            SyncStream::Outgoing => (InvoiceCategory::Standard, BucketKind::Outgoing),
            SyncStream::Drafts => (InvoiceCategory::Standard, BucketKind::OutgoingDraft),
            SyncStream::Archived => (InvoiceCategory::Archived, BucketKind::Outgoing),
            SyncStream::ArchivedDrafts => (InvoiceCategory::Archived, BucketKind::OutgoingDraft),
        }
    }

    /// Draft collections have no stable creation date and are always fetched in full.
    pub fn is_draft(self) -> bool {
        matches!(self, SyncStream::Drafts | SyncStream::ArchivedDrafts)
    }
}

impl fmt::Display for SyncStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceBuckets {
    pub incoming: Vec<InvoiceRecord>,
    pub outgoing: Vec<InvoiceRecord>,
    pub incoming_draft: Vec<InvoiceRecord>,
    pub outgoing_draft: Vec<InvoiceRecord>,
}

impl InvoiceBuckets {
    pub fn get(&self, kind: BucketKind) -> &[InvoiceRecord] {
        match kind {
            BucketKind::Incoming => &self.incoming,
            BucketKind::Outgoing => &self.outgoing,
            BucketKind::IncomingDraft => &self.incoming_draft,
            BucketKind::OutgoingDraft => &self.outgoing_draft,
        }
    }

    pub fn get_mut(&mut self, kind: BucketKind) -> &mut Vec<InvoiceRecord> {
        match kind {
            BucketKind::Incoming => &mut self.incoming,
            BucketKind::Outgoing => &mut self.outgoing,
            BucketKind::IncomingDraft => &mut self.incoming_draft,
            BucketKind::OutgoingDraft => &mut self.outgoing_draft,
        }
    }

    pub fn len(&self) -> usize {
        BucketKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Record counts of one category's four buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub incoming: usize,
    pub outgoing: usize,
    pub incoming_draft: usize,
    pub outgoing_draft: usize,
}

impl From<&InvoiceBuckets> for CategoryCounts {
    fn from(buckets: &InvoiceBuckets) -> Self {
        Self {
            incoming: buckets.incoming.len(),
            outgoing: buckets.outgoing.len(),
            incoming_draft: buckets.incoming_draft.len(),
            outgoing_draft: buckets.outgoing_draft.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    pub standard_invoices: CategoryCounts,
    pub archived_invoices: CategoryCounts,
}

/// Where a record lives inside a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketLocation {
    pub category: InvoiceCategory,
    pub kind: BucketKind,
}

/// Per-user store of every synchronized invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInvoiceLedger {
    pub user_id: Id,
    /// Sum of all eight bucket lengths as of the last save.
    #[serde(default)]
    pub total_invoices: usize,
    #[serde(default)]
    pub standard_invoices: InvoiceBuckets,
    #[serde(default)]
    pub archived_invoices: InvoiceBuckets,
    /// Last successful fetch per stream. Missing means "never synced".
    #[serde(default)]
    pub last_synced_at: BTreeMap<SyncStream, DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_statistics: Option<InvoiceStatistics>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserInvoiceLedger {
    pub fn new(user_id: Id, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_invoices: 0,
            standard_invoices: InvoiceBuckets::default(),
            archived_invoices: InvoiceBuckets::default(),
            last_synced_at: BTreeMap::new(),
            cached_statistics: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn category(&self, category: InvoiceCategory) -> &InvoiceBuckets {
        match category {
            InvoiceCategory::Standard => &self.standard_invoices,
            InvoiceCategory::Archived => &self.archived_invoices,
        }
    }

    pub fn category_mut(&mut self, category: InvoiceCategory) -> &mut InvoiceBuckets {
        match category {
            InvoiceCategory::Standard => &mut self.standard_invoices,
            InvoiceCategory::Archived => &mut self.archived_invoices,
        }
    }

    pub fn bucket(&self, category: InvoiceCategory, kind: BucketKind) -> &[InvoiceRecord] {
        self.category(category).get(kind)
    }

    pub fn bucket_mut(
        &mut self,
        category: InvoiceCategory,
        kind: BucketKind,
    ) -> &mut Vec<InvoiceRecord> {
        self.category_mut(category).get_mut(kind)
    }

    /// Every stored record with its location, standard category first.
    pub fn iter_all(&self) -> impl Iterator<Item = (BucketLocation, &InvoiceRecord)> + '_ {
        InvoiceCategory::ALL.into_iter().flat_map(move |category| {
            BucketKind::ALL.into_iter().flat_map(move |kind| {
                self.bucket(category, kind)
                    .iter()
                    .map(move |record| (BucketLocation { category, kind }, record))
            })
        })
    }

    pub fn record_count(&self) -> usize {
        self.standard_invoices.len() + self.archived_invoices.len()
    }

    /// Refresh the derived total; storage calls this on every save.
    pub fn recompute_total(&mut self) {
        self.total_invoices = self.record_count();
    }

    pub fn bucket_counts(&self) -> BucketCounts {
        BucketCounts {
            standard_invoices: CategoryCounts::from(&self.standard_invoices),
            archived_invoices: CategoryCounts::from(&self.archived_invoices),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn watermark(&self, stream: SyncStream) -> Option<DateTime<Utc>> {
        self.last_synced_at.get(&stream).copied()
    }

    pub fn set_watermark(&mut self, stream: SyncStream, at: DateTime<Utc>) {
        self.last_synced_at.insert(stream, at);
    }

    /// Most recent watermark across all streams.
    pub fn last_synchronization(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at.values().max().copied()
    }

    /// Look a record up in every bucket by `sourceInvoiceId`, `uuid` or `id`.
    pub fn find_by_source_id(&self, source_id: &str) -> Option<(BucketLocation, &InvoiceRecord)> {
        self.iter_all().find(|(_, record)| {
            [SOURCE_ID_FIELD, "uuid", "id"].iter().any(|field| {
                record
                    .get(field)
                    .and_then(super::invoice::scalar_text)
                    .is_some_and(|value| value == source_id)
            })
        })
    }
}
