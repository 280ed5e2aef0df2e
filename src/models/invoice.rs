use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field the merge engine stamps on every stored record.
pub const SOURCE_ID_FIELD: &str = "sourceInvoiceId";

/// Upstream fields that carry the remote unique identifier, in priority order.
const NATURAL_KEY_FIELDS: [&str; 2] = ["uuid", "id"];

/// One invoice as returned by the upstream API.
///
/// The payload is kept verbatim; only `sourceInvoiceId` is added. Typed
/// accessors cover the handful of fields the statistics and customer passes
/// read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceRecord(Map<String, Value>);

impl InvoiceRecord {
    /// Wrap a raw upstream value.
    ///
    /// Returns `None` for non-objects and for records without a natural key;
    /// such records cannot take part in a merge.
    pub fn from_raw(raw: Value) -> Option<Self> {
        let Value::Object(mut fields) = raw else {
            return None;
        };
        let key = natural_key_of(&fields)?;
        fields.insert(SOURCE_ID_FIELD.to_string(), Value::String(key));
        Some(Self(fields))
    }

    /// The merge key: the stamped `sourceInvoiceId`, else `uuid`, else `id`.
    pub fn natural_key(&self) -> Option<String> {
        self.0
            .get(SOURCE_ID_FIELD)
            .and_then(scalar_text)
            .or_else(|| natural_key_of(&self.0))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The other party of the invoice, in whichever shape it was reported.
    pub fn counterparty(&self) -> Option<crate::party::PartyInfo> {
        crate::party::extract(&self.0)
    }

    /// `issueDate`, falling back to `createDate`.
    ///
    /// The first non-empty field wins even if it does not parse, in which case
    /// the record has no usable date.
    pub fn best_date(&self) -> Option<DateTime<Utc>> {
        ["issueDate", "createDate"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(scalar_text))
            .and_then(|raw| parse_timestamp(&raw))
    }

    /// `payableAmount`, parsed permissively. Missing or unparseable amounts are zero.
    pub fn payable_amount(&self) -> Decimal {
        match self.0.get("payableAmount") {
            Some(Value::String(s)) => parse_amount(s),
            Some(Value::Number(n)) => parse_amount(&n.to_string()),
            _ => Decimal::ZERO,
        }
    }
}

/// Natural key of a raw upstream object.
pub fn natural_key_of(fields: &Map<String, Value>) -> Option<String> {
    NATURAL_KEY_FIELDS
        .iter()
        .find_map(|key| fields.get(*key).and_then(scalar_text))
}

/// Text of a string or number value; blank strings count as absent.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a decimal amount, accepting scientific notation and, failing that,
/// the longest leading numeric prefix ("12.5 TRY" is 12.5).
pub(crate) fn parse_amount(raw: &str) -> Decimal {
    let raw = raw.trim();
    if let Ok(value) = Decimal::from_str(raw) {
        return value;
    }
    if let Ok(value) = Decimal::from_scientific(raw) {
        return value;
    }

    let mut end = 0;
    let mut seen_dot = false;
    for (i, ch) in raw.char_indices() {
        let accepted = match ch {
            '+' | '-' => i == 0,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            c => c.is_ascii_digit(),
        };
        if !accepted {
            break;
        }
        end = i + ch.len_utf8();
    }

    Decimal::from_str(raw[..end].trim_end_matches('.')).unwrap_or(Decimal::ZERO)
}
