use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::format::{format_currency, format_percent};
use crate::models::{Customer, UserInvoiceLedger};

use super::metrics::{
    customer_segments, estimated_collection_rate, growth_rate, CustomerSegment, LedgerTotals,
    MonthlySeries,
};
use super::money::{round_cents, to_f64};

const SALES_TARGET: i64 = 100_000;
const COLLECTION_TARGET: f64 = 95.0;
const INVOICE_COUNT_TARGET: f64 = 100.0;
const PROFIT_TARGET: i64 = 20_000;

/// Month-over-month change reported for the collection rate. There is no
/// history to derive it from.
const ESTIMATED_COLLECTION_RATE_CHANGE: f64 = 5.1;

const NO_DATA_MESSAGE: &str = "Henüz fatura verisi bulunamadı.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub value: f64,
    pub change: f64,
    pub formatted: String,
    /// Set on placeholder figures that are not backed by real data.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub estimated: bool,
}

impl Metric {
    fn money(value: Decimal, change: f64, display: &DisplayConfig) -> Self {
        Self {
            value: to_f64(value),
            change,
            formatted: format_currency(value, &display.currency_symbol),
            estimated: false,
        }
    }

    fn zero_money(display: &DisplayConfig) -> Self {
        Self::money(Decimal::ZERO, 0.0, display)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub total_revenue: Metric,
    pub total_expenses: Metric,
    pub net_profit: Metric,
    pub collection_rate: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesAnalysis {
    pub months: Vec<String>,
    pub data: Vec<f64>,
    pub growth: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueExpenseComparison {
    pub months: Vec<String>,
    pub revenue: Vec<f64>,
    pub expenses: Vec<f64>,
}

/// Progress towards fixed targets, each in `..=1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiIndicators {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_invoices: usize,
    pub total_customers: usize,
    pub average_invoice_amount: f64,
    pub last_update_date: DateTime<Utc>,
}

/// Payload of the dashboard and report endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub financial_metrics: FinancialMetrics,
    pub revenue_analysis: SeriesAnalysis,
    pub expense_analysis: SeriesAnalysis,
    pub customer_distribution: Vec<CustomerSegment>,
    pub revenue_expense_comparison: RevenueExpenseComparison,
    pub kpi_indicators: KpiIndicators,
    pub statistics: DashboardStatistics,
}

impl DashboardData {
    /// Zeroed payload for a user who has never synchronized.
    pub fn empty(display: &DisplayConfig, now: DateTime<Utc>) -> Self {
        Self {
            message: Some(NO_DATA_MESSAGE.to_string()),
            financial_metrics: FinancialMetrics {
                total_revenue: Metric::zero_money(display),
                total_expenses: Metric::zero_money(display),
                net_profit: Metric::zero_money(display),
                collection_rate: Metric {
                    value: 0.0,
                    change: 0.0,
                    formatted: "0%".to_string(),
                    estimated: true,
                },
            },
            revenue_analysis: SeriesAnalysis::default(),
            expense_analysis: SeriesAnalysis::default(),
            customer_distribution: Vec::new(),
            revenue_expense_comparison: RevenueExpenseComparison::default(),
            kpi_indicators: KpiIndicators::default(),
            statistics: DashboardStatistics {
                total_invoices: 0,
                total_customers: 0,
                average_invoice_amount: 0.0,
                last_update_date: now,
            },
        }
    }

    pub fn compute(
        ledger: &UserInvoiceLedger,
        customers: &[Customer],
        display: &DisplayConfig,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Self {
        let totals = LedgerTotals::compute(ledger);
        let series = MonthlySeries::compute(ledger, now, tz);
        let profit = totals.profit();
        let collection_rate =
            estimated_collection_rate(totals.incoming_count, display.collection_rate_factor);

        let revenue_growth = growth_rate(&series.revenue);
        let expense_growth = growth_rate(&series.expenses);

        let average_invoice_amount = match totals.non_draft_count() {
            0 => 0.0,
            n => to_f64(round_cents(totals.revenue / Decimal::from(n))),
        };

        Self {
            message: None,
            financial_metrics: FinancialMetrics {
                total_revenue: Metric::money(totals.revenue, revenue_growth, display),
                total_expenses: Metric::money(totals.expenses, expense_growth, display),
                net_profit: Metric::money(profit, series.profit_growth(), display),
                collection_rate: Metric {
                    value: collection_rate,
                    change: ESTIMATED_COLLECTION_RATE_CHANGE,
                    formatted: format_percent(collection_rate),
                    estimated: true,
                },
            },
            revenue_analysis: SeriesAnalysis {
                months: series.months.clone(),
                data: series.revenue.clone(),
                growth: revenue_growth,
            },
            expense_analysis: SeriesAnalysis {
                months: series.months.clone(),
                data: series.expenses.clone(),
                growth: expense_growth,
            },
            customer_distribution: customer_segments(customers),
            kpi_indicators: kpis(&totals, collection_rate),
            revenue_expense_comparison: RevenueExpenseComparison {
                months: series.months,
                revenue: series.revenue,
                expenses: series.expenses,
            },
            statistics: DashboardStatistics {
                total_invoices: totals.total_count(),
                total_customers: customers.len(),
                average_invoice_amount,
                last_update_date: now,
            },
        }
    }
}

fn kpis(totals: &LedgerTotals, collection_rate: f64) -> KpiIndicators {
    let ratio = |value: Decimal, target: i64| to_f64(value / Decimal::from(target)).min(1.0);
    KpiIndicators {
        labels: ["Satış", "Tahsilat", "Fatura", "Karlılık"]
            .into_iter()
            .map(String::from)
            .collect(),
        data: vec![
            ratio(totals.revenue, SALES_TARGET),
            (collection_rate / COLLECTION_TARGET).min(1.0),
            (totals.non_draft_count() as f64 / INVOICE_COUNT_TARGET).min(1.0),
            ratio(totals.profit(), PROFIT_TARGET),
        ],
    }
}
