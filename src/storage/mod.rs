mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{Customer, Id, User, UserInvoiceLedger};

/// Document store behind the sync subsystem.
///
/// Users, ledgers and customers are independent documents; nothing here spans
/// more than one of them atomically.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Users
    async fn get_user(&self, id: &Id) -> Result<Option<User>>;
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Add customer ids to a user's membership list in a single write.
    ///
    /// Ids already on the list are not added twice.
    async fn append_customers_to_user(&self, user_id: &Id, customer_ids: &[Id]) -> Result<()>;

    // Ledgers
    async fn get_ledger(&self, user_id: &Id) -> Result<Option<UserInvoiceLedger>>;

    /// Persist a ledger, refreshing its `total_invoices` first.
    async fn save_ledger(&self, ledger: &mut UserInvoiceLedger) -> Result<()>;

    // Customers
    async fn get_customer(&self, id: &Id) -> Result<Option<Customer>>;
    async fn save_customer(&self, customer: &Customer) -> Result<()>;

    /// Load the given customers, in order. Unknown ids are skipped.
    async fn list_customers(&self, ids: &[Id]) -> Result<Vec<Customer>>;
}

pub(crate) fn merge_membership(existing: &mut Vec<Id>, additions: &[Id]) -> usize {
    let mut added = 0;
    for id in additions {
        if !existing.contains(id) {
            existing.push(id.clone());
            added += 1;
        }
    }
    added
}
