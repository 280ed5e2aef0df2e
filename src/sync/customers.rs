use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::models::{Customer, Flow, Id, InvoiceRecord, UserInvoiceLedger};
use crate::party::{self, PartyInfo};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub processed: usize,
    pub created: usize,
    /// Seen earlier in the batch or already a customer of the user.
    pub skipped_duplicate: usize,
    /// No counterparty identification could be found.
    pub skipped_unidentified: usize,
}

/// Derives customer records from synchronized invoices.
pub struct CustomerExtractor {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl CustomerExtractor {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Create customers for counterparties the user does not know yet.
    ///
    /// Existing customers are never modified. New ids are attached to the
    /// user in one write at the end.
    pub async fn extract(&self, user_id: &Id, records: &[Value]) -> Result<ExtractionReport> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .with_context(|| format!("User not found: {user_id}"))?;

        let known: HashSet<String> = self
            .storage
            .list_customers(&user.customers)
            .await?
            .into_iter()
            .map(|c| c.tax_or_national_id)
            .collect();

        let mut report = ExtractionReport::default();
        let mut seen = HashSet::new();
        let mut created_ids = Vec::new();

        for raw in records {
            report.processed += 1;
            let Some(party) = raw.as_object().and_then(party::extract) else {
                report.skipped_unidentified += 1;
                continue;
            };

            if !seen.insert(party.identification.clone()) || known.contains(&party.identification) {
                report.skipped_duplicate += 1;
                continue;
            }

            let customer = self.customer_from_party(&party);
            match self.storage.save_customer(&customer).await {
                Ok(()) => {
                    debug!(user_id = %user_id, customer = %customer.display_name, shape = ?party.shape, "customer created from invoice");
                    created_ids.push(customer.id);
                    report.created += 1;
                }
                Err(err) => {
                    warn!(user_id = %user_id, identification = %party.identification, error = %format!("{err:#}"), "failed to save customer");
                }
            }
        }

        if !created_ids.is_empty() {
            self.storage
                .append_customers_to_user(user_id, &created_ids)
                .await
                .context("Failed to attach new customers to user")?;
        }

        info!(
            user_id = %user_id,
            processed = report.processed,
            created = report.created,
            skipped_duplicate = report.skipped_duplicate,
            skipped_unidentified = report.skipped_unidentified,
            "customer extraction finished"
        );
        Ok(report)
    }

    fn customer_from_party(&self, party: &PartyInfo) -> Customer {
        let mut customer = Customer::new(
            Id::new(),
            party.identification.clone(),
            party.display_name(),
            self.clock.now(),
        );
        customer.first_name = party.first_name.clone();
        customer.family_name = party.family_name.clone();
        customer.address = party.address.clone().unwrap_or_default().with_defaults();
        customer.is_from_invoice = true;
        customer
    }

    /// Recount how many ledger records reference each of the user's customers.
    ///
    /// Returns the number of customers whose count changed.
    pub async fn update_invoice_counts(&self, user_id: &Id) -> Result<usize> {
        let Some(user) = self.storage.get_user(user_id).await? else {
            return Ok(0);
        };
        let Some(ledger) = self.storage.get_ledger(user_id).await? else {
            return Ok(0);
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for (_, record) in ledger.iter_all() {
            if let Some(id) = party::identification(record.fields()) {
                *counts.entry(id).or_default() += 1;
            }
        }

        let now = self.clock.now();
        let mut changed = 0;
        for mut customer in self.storage.list_customers(&user.customers).await? {
            let count = counts
                .get(&customer.tax_or_national_id)
                .copied()
                .unwrap_or(0);
            if customer.invoice_count != count {
                customer.invoice_count = count;
                customer.updated_at = now;
                self.storage.save_customer(&customer).await?;
                changed += 1;
            }
        }

        info!(user_id = %user_id, changed, "customer invoice counts updated");
        Ok(changed)
    }
}

/// Non-draft records whose counterparty is `customer`, newest first.
///
/// Records without a usable date sort last.
pub fn customer_invoices<'a>(
    ledger: &'a UserInvoiceLedger,
    customer: &Customer,
) -> Vec<&'a InvoiceRecord> {
    let mut records: Vec<(&InvoiceRecord, Option<chrono::DateTime<chrono::Utc>>)> = ledger
        .iter_all()
        .filter(|(location, _)| location.kind.flow() != Flow::Draft)
        .filter(|(_, record)| {
            party::identification(record.fields()).as_deref()
                == Some(customer.tax_or_national_id.as_str())
        })
        .map(|(_, record)| (record, record.best_date()))
        .collect();

    records.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    records.into_iter().map(|(record, _)| record).collect()
}
