mod customer;
mod id;
pub(crate) mod invoice;
mod ledger;
mod statistics;
mod user;

pub use customer::{Customer, PostalAddress, DEFAULT_COUNTRY, UNSPECIFIED};
pub use id::{Id, IdError};
pub use invoice::{natural_key_of, InvoiceRecord, SOURCE_ID_FIELD};
pub use ledger::{
    BucketCounts, BucketKind, BucketLocation, CategoryCounts, Flow, InvoiceBuckets,
    InvoiceCategory, SyncStream, UserInvoiceLedger,
};
pub use statistics::InvoiceStatistics;
pub use user::User;
