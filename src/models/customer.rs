use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;

/// Placeholder for address parts an invoice did not carry.
pub const UNSPECIFIED: &str = "Belirtilmemiş";
pub const DEFAULT_COUNTRY: &str = "Türkiye";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostalAddress {
    pub street: String,
    pub town: String,
    pub city: String,
    pub country: String,
    pub post_code: String,
}

impl PostalAddress {
    /// Fill missing parts with the placeholders used for invoice-derived customers.
    pub fn with_defaults(mut self) -> Self {
        for part in [&mut self.street, &mut self.town, &mut self.city] {
            if part.trim().is_empty() {
                *part = UNSPECIFIED.to_string();
            }
        }
        if self.country.trim().is_empty() {
            self.country = DEFAULT_COUNTRY.to_string();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Id,
    /// VKN or TCKN; matched against invoice counterparties.
    pub tax_or_national_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default)]
    pub address: PostalAddress,
    #[serde(default)]
    pub is_from_invoice: bool,
    /// Best-effort rollup; may lag behind the ledger.
    #[serde(default)]
    pub invoice_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        id: Id,
        tax_or_national_id: impl Into<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tax_or_national_id: tax_or_national_id.into(),
            display_name: display_name.into(),
            first_name: None,
            family_name: None,
            address: PostalAddress::default(),
            is_from_invoice: false,
            invoice_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
