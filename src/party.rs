//! Counterparty detection for raw invoice payloads.
//!
//! The upstream API reports the other party of an invoice in one of three
//! shapes. Every read of `accountingSupplierParty` / `accountingCustomerParty`
//! goes through this module.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::invoice::scalar_text;
use crate::models::PostalAddress;

const SUPPLIER_KEY: &str = "accountingSupplierParty";
const CUSTOMER_KEY: &str = "accountingCustomerParty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartyShape {
    /// `accountingSupplierParty.party` with UBL-style arrays.
    SupplierNested,
    /// Flat fields directly on `accountingSupplierParty`.
    SupplierDirect,
    /// Flat fields directly on `accountingCustomerParty`.
    CustomerDirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyInfo {
    pub shape: PartyShape,
    pub identification: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub family_name: Option<String>,
    /// Only the nested shape carries an address.
    pub address: Option<PostalAddress>,
}

impl PartyInfo {
    /// Explicit name, else "first family", else the identification itself.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        if full.is_empty() {
            self.identification.clone()
        } else {
            full.to_string()
        }
    }
}

/// Decide which shape a record uses, without extracting anything.
///
/// A present supplier party is the only candidate even when it turns out to
/// be unusable; the customer party is consulted only when no supplier exists.
pub fn detect(invoice: &Map<String, Value>) -> Option<(PartyShape, &Map<String, Value>)> {
    if let Some(supplier) = object(invoice.get(SUPPLIER_KEY)) {
        if let Some(party) = object(supplier.get("party")) {
            return Some((PartyShape::SupplierNested, party));
        }
        if supplier.get("partyIdentification").is_some_and(is_truthy) {
            return Some((PartyShape::SupplierDirect, supplier));
        }
        return None;
    }
    object(invoice.get(CUSTOMER_KEY)).map(|customer| (PartyShape::CustomerDirect, customer))
}

/// Full counterparty of an invoice, or `None` when no identification is found.
pub fn extract(invoice: &Map<String, Value>) -> Option<PartyInfo> {
    let (shape, party) = detect(invoice)?;
    let info = match shape {
        PartyShape::SupplierNested => PartyInfo {
            shape,
            identification: nested_identification(party)?,
            name: first_of(party, "partyName").and_then(|p| text(p.get("name"))),
            first_name: first_of(party, "person").and_then(|p| text(p.get("firstName"))),
            family_name: first_of(party, "person").and_then(|p| text(p.get("familyName"))),
            address: first_of(party, "postalAddress").map(postal_address),
        },
        PartyShape::SupplierDirect | PartyShape::CustomerDirect => PartyInfo {
            shape,
            identification: text(party.get("partyIdentification"))?,
            name: text(party.get("partyName")),
            first_name: text(party.get("firstName")),
            family_name: text(party.get("familyName")),
            address: None,
        },
    };
    Some(info)
}

/// Identification only; used by the invoice-count rollup.
pub fn identification(invoice: &Map<String, Value>) -> Option<String> {
    let (shape, party) = detect(invoice)?;
    match shape {
        PartyShape::SupplierNested => nested_identification(party),
        PartyShape::SupplierDirect | PartyShape::CustomerDirect => {
            text(party.get("partyIdentification"))
        }
    }
}

fn nested_identification(party: &Map<String, Value>) -> Option<String> {
    first_of(party, "partyIdentification").and_then(|p| text(p.get("id")))
}

fn postal_address(raw: &Map<String, Value>) -> PostalAddress {
    PostalAddress {
        street: text(raw.get("streetName")).unwrap_or_default(),
        town: text(raw.get("citySubdivisionName")).unwrap_or_default(),
        city: text(raw.get("cityName")).unwrap_or_default(),
        country: object(raw.get("country"))
            .and_then(|c| text(c.get("name")))
            .unwrap_or_default(),
        post_code: text(raw.get("postalZone")).unwrap_or_default(),
    }
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

fn first_of<'a>(party: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    party
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(scalar_text)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
