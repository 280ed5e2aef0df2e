use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::InvoiceRecord;

/// Counts of one merge into one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub new: usize,
    pub updated: usize,
    /// Records without a natural key; neither new nor updated.
    pub skipped: usize,
}

/// Upsert `incoming` into `bucket` by natural key.
///
/// Existing records are replaced in place and keep their position; unseen
/// keys are appended in batch order. A key repeated inside the batch is
/// inserted once and then updated.
pub fn merge_into(bucket: &mut Vec<InvoiceRecord>, incoming: Vec<Value>) -> MergeOutcome {
    let mut index: HashMap<String, usize> = bucket
        .iter()
        .enumerate()
        .filter_map(|(pos, record)| record.natural_key().map(|key| (key, pos)))
        .collect();

    let mut outcome = MergeOutcome::default();
    for raw in incoming {
        let Some(record) = InvoiceRecord::from_raw(raw) else {
            outcome.skipped += 1;
            continue;
        };
        let Some(key) = record.natural_key() else {
            outcome.skipped += 1;
            continue;
        };

        match index.get(&key) {
            Some(&pos) => {
                bucket[pos] = record;
                outcome.updated += 1;
            }
            None => {
                index.insert(key, bucket.len());
                bucket.push(record);
                outcome.new += 1;
            }
        }
    }
    outcome
}
