mod support;

use std::sync::Arc;

use anyhow::Result;
use faturabia::config::{DisplayConfig, NestenConfig};
use faturabia::error::SyncError;
use faturabia::models::{Id, SyncStream};
use faturabia::stats::ReportService;
use faturabia::storage::Storage;
use faturabia::sync::InvoiceSyncService;
use serde_json::json;
use support::{
    customer_invoice, fixed_clock, storage_with_user, supplier_invoice, ScriptedFactory,
    ScriptedSource,
};

async fn synced_storage() -> Result<Arc<dyn Storage>> {
    let storage = storage_with_user("u1", Some("k")).await;
    let factory = Arc::new(ScriptedFactory::new(
        ScriptedSource::new()
            .with_records(
                SyncStream::Incoming,
                vec![
                    supplier_invoice("i1", "111", "Acme", "1000"),
                    supplier_invoice("i2", "111", "Acme", "250.25"),
                    json!({
                        "uuid": "i-old",
                        "payableAmount": "400",
                        "issueDate": "2024-05-10",
                        "accountingSupplierParty": {"partyIdentification": "333", "partyName": "Gamma"}
                    }),
                ],
            )
            .with_records(
                SyncStream::Outgoing,
                vec![customer_invoice("o1", "222", "Beta", "300")],
            )
            .with_records(
                SyncStream::Drafts,
                vec![customer_invoice("d1", "222", "Beta", "9999")],
            ),
    ));
    let shared: Arc<dyn Storage> = storage;
    let service = InvoiceSyncService::new(Arc::clone(&shared), factory, NestenConfig::default())
        .with_clock(fixed_clock());
    service.fetch_all(&Id::from("u1")).await?;
    service.jobs().wait_idle().await;
    Ok(shared)
}

fn reports(storage: Arc<dyn Storage>) -> Result<ReportService> {
    Ok(ReportService::new(storage, DisplayConfig::default())?.with_clock(fixed_clock()))
}

#[tokio::test]
async fn dashboard_aggregates_the_synced_ledger() -> Result<()> {
    let reports = reports(synced_storage().await?)?;
    let data = reports.dashboard(&Id::from("u1")).await?;

    let metrics = &data.financial_metrics;
    assert_eq!(metrics.total_revenue.value, 1650.25);
    assert_eq!(metrics.total_revenue.formatted, "₺1.650,25");
    assert_eq!(metrics.total_expenses.value, 300.0);
    assert_eq!(metrics.net_profit.value, 1350.25);
    // floor(3 * 0.92) = 2 of 3
    assert!((metrics.collection_rate.value - 66.67).abs() < 0.01);
    assert!(metrics.collection_rate.estimated);

    assert_eq!(data.revenue_analysis.months.len(), 6);
    assert_eq!(data.revenue_analysis.months.last().unwrap(), "Haz");
    assert_eq!(data.revenue_analysis.data[4], 400.0);
    assert_eq!(data.revenue_analysis.data[5], 1250.0);
    assert!((data.revenue_analysis.growth - 212.5).abs() < 1e-9);

    assert_eq!(data.statistics.total_invoices, 5);
    assert_eq!(data.statistics.total_customers, 3);
    assert!(data.message.is_none());
    Ok(())
}

#[tokio::test]
async fn customer_segments_follow_invoice_counts() -> Result<()> {
    let reports = reports(synced_storage().await?)?;
    let data = reports.dashboard(&Id::from("u1")).await?;

    let c_segment = data
        .customer_distribution
        .iter()
        .find(|s| s.name == "C Segmenti")
        .unwrap();
    assert_eq!(c_segment.customers, 3);
    assert_eq!(c_segment.population, 100);
    Ok(())
}

#[tokio::test]
async fn statistics_use_the_cache_written_by_the_pass() -> Result<()> {
    let reports = reports(synced_storage().await?)?;
    let stats = reports.statistics(&Id::from("u1")).await?;
    assert_eq!(stats.total_invoices, 5);
    assert_eq!(stats.incoming_count, 3);
    assert_eq!(stats.outgoing_count, 1);
    assert_eq!(stats.draft_count, 1);
    assert_eq!(stats.profit_loss.to_string(), "1350.25");
    Ok(())
}

#[tokio::test]
async fn never_synced_user_gets_zeroed_reports() -> Result<()> {
    let storage: Arc<dyn Storage> = storage_with_user("u1", None).await;
    let reports = reports(storage)?;

    let data = reports.dashboard(&Id::from("u1")).await?;
    assert!(data.message.is_some());
    assert_eq!(data.statistics.total_invoices, 0);

    let stats = reports.statistics(&Id::from("u1")).await?;
    assert_eq!(stats.total_invoices, 0);

    let status = reports.status(&Id::from("u1")).await?;
    assert!(!status.api_key_status.has_api_key);
    assert!(status.last_synchronization.date.is_none());
    Ok(())
}

#[tokio::test]
async fn status_reports_breakdown_and_last_sync() -> Result<()> {
    let reports = reports(synced_storage().await?)?;
    let status = reports.status(&Id::from("u1")).await?;

    assert!(status.api_key_status.has_api_key);
    assert_eq!(status.synchronized_invoice_count.total, 5);
    assert_eq!(
        status.last_synchronization.formatted,
        "15.06.2024 12:00:00"
    );
    assert_eq!(status.last_synchronization.details.len(), 5);
    Ok(())
}

#[tokio::test]
async fn customer_invoices_are_scoped_to_the_user() -> Result<()> {
    let storage = synced_storage().await?;
    let user = storage.get_user(&Id::from("u1")).await?.unwrap();
    let customers = storage.list_customers(&user.customers).await?;
    let acme = customers
        .iter()
        .find(|c| c.tax_or_national_id == "111")
        .unwrap();

    let reports = reports(Arc::clone(&storage))?;
    let result = reports.customer_invoices(&Id::from("u1"), &acme.id).await?;
    assert_eq!(result.invoices.len(), 2);

    let err = reports
        .customer_invoices(&Id::from("u1"), &Id::from("not-mine"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::CustomerNotFound(_)));
    Ok(())
}
