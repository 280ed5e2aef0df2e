use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

/// Inclusive date range sent as `startDate` / `endDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyncWindow {
    /// Window for one incremental fetch.
    ///
    /// Starts `overlap` before the watermark (or at `epoch` when the stream
    /// was never synced) and ends on `tomorrow`.
    pub fn compute(
        watermark: Option<DateTime<Utc>>,
        overlap: Duration,
        epoch: NaiveDate,
        tomorrow: NaiveDate,
    ) -> Self {
        let start = match watermark {
            Some(at) => {
                let overlap = TimeDelta::from_std(overlap).unwrap_or(TimeDelta::zero());
                at.checked_sub_signed(overlap)
                    .unwrap_or(at)
                    .date_naive()
            }
            None => epoch,
        };
        Self {
            start,
            end: tomorrow,
        }
    }

    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}
