#![cfg(feature = "nesten")]

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use faturabia::config::NestenConfig;
use faturabia::error::SyncError;
use faturabia::models::SyncStream;
use faturabia::nesten::{FetchOptions, InvoiceSource, NestenClient, SyncWindow};
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> NestenConfig {
    NestenConfig {
        einvoice_base_url: format!("{}/einvoice/v1", server.uri()),
        earchive_base_url: format!("{}/earchive/v1/", server.uri()),
        request_timeout: Duration::from_secs(5),
        ..NestenConfig::default()
    }
}

fn client(server: &MockServer) -> Result<NestenClient> {
    NestenClient::new(SecretString::from("test-token".to_string()), &config_for(server))
}

fn records(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"uuid": format!("{prefix}-{i}"), "payableAmount": 10}))
        .collect()
}

fn page(records: Vec<Value>, total: usize) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"data": records, "totalCount": total}))
}

fn window() -> SyncWindow {
    SyncWindow {
        start: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
    }
}

#[tokio::test]
async fn fetches_remaining_pages_after_the_first() -> Result<()> {
    let server = MockServer::start().await;
    for (n, count) in [(1, 100), (2, 100), (3, 50)] {
        Mock::given(method("GET"))
            .and(path("/einvoice/v1/incoming/invoices"))
            .and(query_param("page", n.to_string()))
            .and(query_param("pageSize", "100"))
            .and(bearer_token("test-token"))
            .respond_with(page(records(&format!("p{n}"), count), 250))
            .expect(1)
            .mount(&server)
            .await;
    }

    let options = FetchOptions::from_config(&NestenConfig::default());
    let fetched = client(&server)?
        .fetch_all(SyncStream::Incoming, &options)
        .await?;

    assert_eq!(fetched.len(), 250);
    assert_eq!(fetched[0]["uuid"], "p1-0");
    Ok(())
}

#[tokio::test]
async fn single_page_collection_makes_one_request() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/earchive/v1/invoices"))
        .respond_with(page(records("a", 3), 3))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default());
    let fetched = client(&server)?
        .fetch_all(SyncStream::Archived, &options)
        .await?;
    assert_eq!(fetched.len(), 3);
    Ok(())
}

#[tokio::test]
async fn dated_collections_send_window_and_sort() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/einvoice/v1/outgoing/invoices"))
        .and(query_param("startDate", "2024-06-14"))
        .and(query_param("endDate", "2024-06-16"))
        .and(query_param("sort", "CreatedAt desc"))
        .and(query_param("status", "approved"))
        .respond_with(page(records("o", 1), 1))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default())
        .with_window(window())
        .with_filter("status", "approved");
    let fetched = client(&server)?
        .fetch_all(SyncStream::Outgoing, &options)
        .await?;
    assert_eq!(fetched.len(), 1);
    Ok(())
}

#[tokio::test]
async fn draft_collections_never_send_dates() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/einvoice/v1/outgoing/invoices/drafts"))
        .and(query_param_is_missing("startDate"))
        .and(query_param_is_missing("endDate"))
        .respond_with(page(records("d", 2), 2))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default()).with_window(window());
    let fetched = client(&server)?
        .fetch_all(SyncStream::Drafts, &options)
        .await?;
    assert_eq!(fetched.len(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_later_page_is_dropped_not_fatal() -> Result<()> {
    let server = MockServer::start().await;
    let base = "/earchive/v1/invoices/drafts";
    Mock::given(method("GET"))
        .and(path(base))
        .and(query_param("page", "1"))
        .respond_with(page(records("p1", 100), 230))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(base))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(base))
        .and(query_param("page", "3"))
        .respond_with(page(records("p3", 30), 230))
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default());
    let fetched = client(&server)?
        .fetch_all(SyncStream::ArchivedDrafts, &options)
        .await?;
    assert_eq!(fetched.len(), 130);
    Ok(())
}

#[tokio::test]
async fn first_page_failure_surfaces_status_and_body() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/einvoice/v1/incoming/invoices"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default());
    let err = client(&server)?
        .fetch_all(SyncStream::Incoming, &options)
        .await
        .unwrap_err();
    match err {
        SyncError::Upstream { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/einvoice/v1/incoming/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let options = FetchOptions::from_config(&NestenConfig::default());
    let err = client(&server)?
        .fetch_all(SyncStream::Incoming, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)));
    Ok(())
}

#[tokio::test]
async fn slow_upstream_times_out() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/einvoice/v1/incoming/invoices"))
        .respond_with(page(Vec::new(), 0).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = NestenConfig {
        request_timeout: Duration::from_millis(50),
        ..config_for(&server)
    };
    let client = NestenClient::new(SecretString::from("t".to_string()), &config)?;
    let err = client
        .fetch_all(SyncStream::Incoming, &FetchOptions::from_config(&config))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout));
    Ok(())
}
