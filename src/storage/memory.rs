//! In-memory storage for tests and embedding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use crate::models::{Customer, Id, User, UserInvoiceLedger};

use super::{merge_membership, Storage};

#[derive(Default)]
pub struct MemoryStorage {
    users: Mutex<HashMap<Id, User>>,
    ledgers: Mutex<HashMap<Id, UserInvoiceLedger>>,
    customers: Mutex<HashMap<Id, Customer>>,
    user_writes: AtomicUsize,
    fail_ledger_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user-document writes so far.
    pub fn user_writes(&self) -> usize {
        self.user_writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent `save_ledger` fail.
    pub fn fail_ledger_saves(&self, fail: bool) {
        self.fail_ledger_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: &Id) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(id).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().await;
        users.insert(user.id.clone(), user.clone());
        self.user_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_customers_to_user(&self, user_id: &Id, customer_ids: &[Id]) -> Result<()> {
        let mut users = self.users.lock().await;
        let Some(user) = users.get_mut(user_id) else {
            bail!("User not found: {user_id}");
        };
        merge_membership(&mut user.customers, customer_ids);
        self.user_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_ledger(&self, user_id: &Id) -> Result<Option<UserInvoiceLedger>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers.get(user_id).cloned())
    }

    async fn save_ledger(&self, ledger: &mut UserInvoiceLedger) -> Result<()> {
        if self.fail_ledger_saves.load(Ordering::SeqCst) {
            bail!("ledger store unavailable");
        }
        ledger.recompute_total();
        let mut ledgers = self.ledgers.lock().await;
        ledgers.insert(ledger.user_id.clone(), ledger.clone());
        Ok(())
    }

    async fn get_customer(&self, id: &Id) -> Result<Option<Customer>> {
        let customers = self.customers.lock().await;
        Ok(customers.get(id).cloned())
    }

    async fn save_customer(&self, customer: &Customer) -> Result<()> {
        let mut customers = self.customers.lock().await;
        customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn list_customers(&self, ids: &[Id]) -> Result<Vec<Customer>> {
        let customers = self.customers.lock().await;
        Ok(ids.iter().filter_map(|id| customers.get(id).cloned()).collect())
    }
}
