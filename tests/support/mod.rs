#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use faturabia::clock::FixedClock;
use faturabia::error::SyncError;
use faturabia::models::{Id, SyncStream, User};
use faturabia::nesten::{InvoicePage, InvoiceSource, InvoiceSourceFactory, PageRequest};
use faturabia::storage::{MemoryStorage, Storage};
use secrecy::SecretString;
use serde_json::{json, Value};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_now()))
}

pub async fn storage_with_user(user_id: &str, api_key: Option<&str>) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    let mut user = User::new(Id::from(user_id), "Test User", "test@example.com");
    if let Some(key) = api_key {
        user = user.with_nes_api_key(key);
    }
    storage.save_user(&user).await.unwrap();
    storage
}

/// Invoice whose counterparty is a flat supplier party.
pub fn supplier_invoice(uuid: &str, party_id: &str, name: &str, amount: &str) -> Value {
    json!({
        "uuid": uuid,
        "payableAmount": amount,
        "issueDate": "2024-06-03",
        "accountingSupplierParty": {
            "partyIdentification": party_id,
            "partyName": name
        }
    })
}

/// Invoice whose counterparty is a flat customer party.
pub fn customer_invoice(uuid: &str, party_id: &str, name: &str, amount: &str) -> Value {
    json!({
        "uuid": uuid,
        "payableAmount": amount,
        "issueDate": "2024-06-04",
        "accountingCustomerParty": {
            "partyIdentification": party_id,
            "partyName": name
        }
    })
}

/// In-process source serving fixed record sets per collection.
///
/// Every collection answers as a single page. Failing collections return an
/// upstream 500 for every page.
#[derive(Default)]
pub struct ScriptedSource {
    records: HashMap<SyncStream, Vec<Value>>,
    failing: HashSet<SyncStream>,
    requests: Mutex<Vec<(SyncStream, PageRequest)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, stream: SyncStream, records: Vec<Value>) -> Self {
        self.records.insert(stream, records);
        self
    }

    pub fn failing(mut self, stream: SyncStream) -> Self {
        self.failing.insert(stream);
        self
    }

    pub fn failing_all(mut self) -> Self {
        self.failing.extend(SyncStream::ALL);
        self
    }

    pub fn requests(&self) -> Vec<(SyncStream, PageRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_for(&self, stream: SyncStream) -> Option<PageRequest> {
        self.requests()
            .into_iter()
            .find(|(s, _)| *s == stream)
            .map(|(_, req)| req)
    }
}

#[async_trait]
impl InvoiceSource for ScriptedSource {
    async fn fetch_page(
        &self,
        stream: SyncStream,
        request: &PageRequest,
    ) -> Result<InvoicePage, SyncError> {
        self.requests.lock().unwrap().push((stream, request.clone()));
        if self.failing.contains(&stream) {
            return Err(SyncError::Upstream {
                status: 500,
                body: format!("{stream} unavailable"),
            });
        }
        let records = self.records.get(&stream).cloned().unwrap_or_default();
        Ok(InvoicePage {
            total_count: records.len() as u64,
            records,
        })
    }
}

/// Hands out one shared [`ScriptedSource`] and remembers the keys it saw.
pub struct ScriptedFactory {
    source: Arc<ScriptedSource>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new(source: ScriptedSource) -> Self {
        Self {
            source: Arc::new(source),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn source(&self) -> Arc<ScriptedSource> {
        Arc::clone(&self.source)
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl InvoiceSourceFactory for ScriptedFactory {
    fn create(&self, api_key: SecretString) -> anyhow::Result<Arc<dyn InvoiceSource>> {
        use secrecy::ExposeSecret;
        self.keys
            .lock()
            .unwrap()
            .push(api_key.expose_secret().to_string());
        Ok(self.source.clone())
    }
}
