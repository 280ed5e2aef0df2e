//! Invoice synchronization: merge engine, fetch-all orchestrator and the
//! background customer pass.

mod customers;
mod jobs;
mod locks;
mod merge;
mod orchestrator;

pub use customers::{customer_invoices, CustomerExtractor, ExtractionReport};
pub use jobs::{BackgroundJobs, JobFailure};
pub use locks::UserLocks;
pub use merge::{merge_into, MergeOutcome};
pub use orchestrator::{
    CollectionError, CollectionOutcome, FetchAllSummary, InvoiceSyncService, SummaryTotals,
};
