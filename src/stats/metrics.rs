use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::format::TR_MONTHS_SHORT;
use crate::models::{Customer, Flow, InvoiceStatistics, UserInvoiceLedger};

use super::money::{round_cents, round_whole, sum_cents, to_f64};

/// Number of calendar months in dashboard series, current month included.
pub const SERIES_MONTHS: usize = 6;

/// Revenue, expense and counts over every bucket of a ledger.
///
/// Revenue is the sum over incoming records, expense over outgoing records;
/// drafts are counted but never summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub incoming_count: usize,
    pub outgoing_count: usize,
    pub draft_count: usize,
}

impl LedgerTotals {
    pub fn compute(ledger: &UserInvoiceLedger) -> Self {
        let mut totals = Self::default();
        let mut revenue = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;
        for (location, record) in ledger.iter_all() {
            match location.kind.flow() {
                Flow::Incoming => {
                    totals.incoming_count += 1;
                    revenue = revenue.saturating_add(record.payable_amount());
                }
                Flow::Outgoing => {
                    totals.outgoing_count += 1;
                    expenses = expenses.saturating_add(record.payable_amount());
                }
                Flow::Draft => totals.draft_count += 1,
            }
        }
        totals.revenue = round_cents(revenue);
        totals.expenses = round_cents(expenses);
        totals
    }

    pub fn profit(&self) -> Decimal {
        round_cents(self.revenue.saturating_sub(self.expenses))
    }

    pub fn non_draft_count(&self) -> usize {
        self.incoming_count + self.outgoing_count
    }

    pub fn total_count(&self) -> usize {
        self.non_draft_count() + self.draft_count
    }
}

/// The snapshot cached on the ledger after every fetch-all pass.
pub fn compute_statistics(ledger: &UserInvoiceLedger, now: DateTime<Utc>) -> InvoiceStatistics {
    let totals = LedgerTotals::compute(ledger);
    InvoiceStatistics {
        total_invoices: totals.total_count(),
        incoming_count: totals.incoming_count,
        outgoing_count: totals.outgoing_count,
        draft_count: totals.draft_count,
        incoming_amount: totals.revenue,
        outgoing_amount: totals.expenses,
        total_amount: sum_cents([totals.revenue, totals.expenses]),
        profit_loss: totals.profit(),
        calculated_at: now,
    }
}

/// Estimated share of collected incoming invoices, in percent.
///
/// Placeholder: the upstream data has no payment status, so this is
/// `floor(count * factor) / count`, not a measured settlement rate.
pub fn estimated_collection_rate(incoming_count: usize, factor: Decimal) -> f64 {
    if incoming_count == 0 {
        return 0.0;
    }
    let count = Decimal::from(incoming_count);
    let collected = (count * factor).floor();
    to_f64(collected / count * Decimal::ONE_HUNDRED)
}

/// Percent change between the last two points; 0 without a usable base.
pub fn growth_rate(series: &[f64]) -> f64 {
    let [.., previous, current] = series else {
        return 0.0;
    };
    if *previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Revenue and expenses per calendar month, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub months: Vec<String>,
    pub revenue: Vec<f64>,
    pub expenses: Vec<f64>,
}

impl MonthlySeries {
    /// Trailing `SERIES_MONTHS` months ending with the month of `now` in `tz`.
    ///
    /// Records are placed by `issueDate` (else `createDate`) in `tz`; records
    /// without a usable date are left out. Values are rounded to whole units.
    pub fn compute(ledger: &UserInvoiceLedger, now: DateTime<Utc>, tz: Tz) -> Self {
        let local_now = now.with_timezone(&tz);
        let current = month_index(local_now.year(), local_now.month());
        let first = current - (SERIES_MONTHS as i32 - 1);

        let mut revenue = vec![Decimal::ZERO; SERIES_MONTHS];
        let mut expenses = vec![Decimal::ZERO; SERIES_MONTHS];

        for (location, record) in ledger.iter_all() {
            let target = match location.kind.flow() {
                Flow::Incoming => &mut revenue,
                Flow::Outgoing => &mut expenses,
                Flow::Draft => continue,
            };
            let Some(date) = record.best_date() else {
                continue;
            };
            let local = date.with_timezone(&tz);
            let offset = month_index(local.year(), local.month()) - first;
            if let Ok(slot) = usize::try_from(offset) {
                if slot < SERIES_MONTHS {
                    target[slot] = target[slot].saturating_add(record.payable_amount());
                }
            }
        }

        let months = (first..=current)
            .map(|index| TR_MONTHS_SHORT[index.rem_euclid(12) as usize].to_string())
            .collect();
        let whole = |values: Vec<Decimal>| {
            values
                .into_iter()
                .map(|v| to_f64(round_whole(v)))
                .collect()
        };

        Self {
            months,
            revenue: whole(revenue),
            expenses: whole(expenses),
        }
    }

    /// Month-over-month change of revenue minus expenses.
    pub fn profit_growth(&self) -> f64 {
        let profit: Vec<f64> = self
            .revenue
            .iter()
            .zip(&self.expenses)
            .map(|(r, e)| r - e)
            .collect();
        growth_rate(&profit)
    }
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

/// Share of segmented customers in one invoice-count tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSegment {
    pub name: String,
    /// Whole percent of customers with at least one invoice.
    pub population: u32,
    pub customers: usize,
}

/// A: 10+ invoices, B: 5 to 9, C: 1 to 4. Customers with no invoices are
/// left out of the percentages.
pub fn customer_segments(customers: &[Customer]) -> Vec<CustomerSegment> {
    let mut tiers = [0usize; 3];
    for customer in customers {
        match customer.invoice_count {
            0 => {}
            1..=4 => tiers[2] += 1,
            5..=9 => tiers[1] += 1,
            _ => tiers[0] += 1,
        }
    }
    let segmented: usize = tiers.iter().sum();

    ["A Segmenti", "B Segmenti", "C Segmenti"]
        .into_iter()
        .zip(tiers)
        .map(|(name, count)| CustomerSegment {
            name: name.to_string(),
            population: if segmented == 0 {
                0
            } else {
                (count as f64 / segmented as f64 * 100.0).round() as u32
            },
            customers: count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BucketKind, Id, InvoiceCategory, InvoiceRecord};
    use chrono::TimeZone;
    use serde_json::json;
    use std::str::FromStr;

    fn record(uuid: &str, amount: &str, date: &str) -> InvoiceRecord {
        InvoiceRecord::from_raw(json!({
            "uuid": uuid,
            "payableAmount": amount,
            "issueDate": date
        }))
        .unwrap()
    }

    fn ledger() -> UserInvoiceLedger {
        let mut ledger = UserInvoiceLedger::new(Id::from("u1"), Utc::now());
        ledger
            .bucket_mut(InvoiceCategory::Standard, BucketKind::Incoming)
            .extend([
                record("i1", "100.005", "2024-06-03"),
                record("i2", "50", "2024-05-20"),
            ]);
        ledger
            .bucket_mut(InvoiceCategory::Archived, BucketKind::Outgoing)
            .push(record("o1", "30.10", "2024-06-10"));
        ledger
            .bucket_mut(InvoiceCategory::Standard, BucketKind::OutgoingDraft)
            .push(record("d1", "999", "2024-06-11"));
        ledger
    }

    #[test]
    fn oversized_amounts_saturate() {
        let huge = "79228162514264337593543950335";
        let mut ledger = UserInvoiceLedger::new(Id::from("u1"), Utc::now());
        ledger
            .bucket_mut(InvoiceCategory::Standard, BucketKind::Incoming)
            .extend([record("i1", huge, "2024-06-03"), record("i2", huge, "2024-06-04")]);
        ledger
            .bucket_mut(InvoiceCategory::Standard, BucketKind::Outgoing)
            .extend([
                record("o1", &format!("-{huge}"), "2024-06-03"),
                record("o2", &format!("-{huge}"), "2024-06-04"),
            ]);

        let totals = LedgerTotals::compute(&ledger);
        assert_eq!(totals.revenue, Decimal::MAX);
        assert_eq!(totals.expenses, Decimal::MIN);
        assert_eq!(totals.profit(), Decimal::MAX);

        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let series = MonthlySeries::compute(&ledger, now, chrono_tz::Europe::Istanbul);
        assert!(series.revenue[5] > 7.9e28);
    }

    #[test]
    fn totals_split_by_flow_and_round_to_cents() {
        let totals = LedgerTotals::compute(&ledger());
        assert_eq!(totals.revenue, Decimal::from_str("150.01").unwrap());
        assert_eq!(totals.expenses, Decimal::from_str("30.10").unwrap());
        assert_eq!(totals.profit(), Decimal::from_str("119.91").unwrap());
        assert_eq!(
            (totals.incoming_count, totals.outgoing_count, totals.draft_count),
            (2, 1, 1)
        );
    }

    #[test]
    fn cached_statistics_cover_all_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let stats = compute_statistics(&ledger(), now);
        assert_eq!(stats.total_invoices, 4);
        assert_eq!(stats.total_amount, Decimal::from_str("180.11").unwrap());
        assert_eq!(stats.calculated_at, now);
    }

    #[test]
    fn collection_rate_is_floor_of_factor() {
        let factor = Decimal::new(92, 2);
        assert_eq!(estimated_collection_rate(0, factor), 0.0);
        assert_eq!(estimated_collection_rate(100, factor), 92.0);
        // floor(3 * 0.92) = 2
        let rate = estimated_collection_rate(3, factor);
        assert!((rate - 66.666_666).abs() < 0.001, "{rate}");
    }

    #[test]
    fn growth_rate_guards_against_zero_base() {
        assert_eq!(growth_rate(&[]), 0.0);
        assert_eq!(growth_rate(&[5.0]), 0.0);
        assert_eq!(growth_rate(&[0.0, 10.0]), 0.0);
        assert_eq!(growth_rate(&[100.0, 150.0]), 50.0);
        assert_eq!(growth_rate(&[1.0, 200.0, 100.0]), -50.0);
    }

    #[test]
    fn monthly_series_ends_in_current_month() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let series = MonthlySeries::compute(&ledger(), now, chrono_tz::Europe::Istanbul);
        assert_eq!(series.months, vec!["Oca", "Şub", "Mar", "Nis", "May", "Haz"]);
        assert_eq!(series.revenue, vec![0.0, 0.0, 0.0, 0.0, 50.0, 100.0]);
        assert_eq!(series.expenses, vec![0.0, 0.0, 0.0, 0.0, 0.0, 30.0]);
        assert_eq!(series.profit_growth(), 40.0);
    }

    #[test]
    fn monthly_series_uses_display_zone_and_wraps_years() {
        let mut ledger = UserInvoiceLedger::new(Id::from("u1"), Utc::now());
        // 22:30 UTC on 31 Dec is already January in Istanbul.
        ledger
            .bucket_mut(InvoiceCategory::Standard, BucketKind::Incoming)
            .push(record("i1", "10", "2024-12-31T22:30:00Z"));
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        let series = MonthlySeries::compute(&ledger, now, chrono_tz::Europe::Istanbul);
        assert_eq!(series.months, vec!["Eyl", "Eki", "Kas", "Ara", "Oca", "Şub"]);
        assert_eq!(series.revenue[4], 10.0);
        assert_eq!(series.revenue[3], 0.0);
    }

    #[test]
    fn segments_ignore_customers_without_invoices() {
        let now = Utc::now();
        let customers: Vec<Customer> = [12, 7, 1, 2, 0]
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let mut c = Customer::new(Id::from(format!("c{i}")), i.to_string(), "x", now);
                c.invoice_count = count;
                c
            })
            .collect();

        let segments = customer_segments(&customers);
        let populations: Vec<u32> = segments.iter().map(|s| s.population).collect();
        assert_eq!(populations, vec![25, 25, 50]);
        assert_eq!(segments[2].customers, 2);
        assert!(customer_segments(&[]).iter().all(|s| s.population == 0));
    }
}
