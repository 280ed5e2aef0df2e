use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::NestenConfig;
use crate::error::SyncError;
use crate::models::SyncStream;

use super::{Api, InvoicePage, InvoiceSource, InvoiceSourceFactory, PageRequest};

/// HTTP client for one Nesten account.
#[derive(Clone)]
pub struct NestenClient {
    http: Client,
    api_key: SecretString,
    einvoice_base_url: String,
    earchive_base_url: String,
}

impl NestenClient {
    pub fn new(api_key: SecretString, config: &NestenConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        Ok(Self::with_http(http, api_key, config))
    }

    fn with_http(http: Client, api_key: SecretString, config: &NestenConfig) -> Self {
        Self {
            http,
            api_key,
            einvoice_base_url: trim_base(&config.einvoice_base_url),
            earchive_base_url: trim_base(&config.earchive_base_url),
        }
    }

    /// Point both APIs somewhere else (a mock server, a staging host).
    pub fn with_base_urls(
        mut self,
        einvoice_base_url: impl AsRef<str>,
        earchive_base_url: impl AsRef<str>,
    ) -> Self {
        self.einvoice_base_url = trim_base(einvoice_base_url.as_ref());
        self.earchive_base_url = trim_base(earchive_base_url.as_ref());
        self
    }

    fn url(&self, stream: SyncStream) -> String {
        let base = match stream.api() {
            Api::EInvoice => &self.einvoice_base_url,
            Api::EArchive => &self.earchive_base_url,
        };
        format!("{base}{}", stream.path())
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn build_http_client(config: &NestenConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")
}

fn transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
impl InvoiceSource for NestenClient {
    async fn fetch_page(
        &self,
        stream: SyncStream,
        request: &PageRequest,
    ) -> Result<InvoicePage, SyncError> {
        let url = self.url(stream);
        debug!(%stream, page = request.page, %url, "requesting invoice page");

        let response = self
            .http
            .get(&url)
            .query(&request.query())
            .bearer_auth(self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(SyncError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

/// Creates per-user clients sharing one connection pool.
pub struct NestenClientFactory {
    http: Client,
    config: NestenConfig,
}

impl NestenClientFactory {
    pub fn new(config: NestenConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(&config)?,
            config,
        })
    }
}

impl InvoiceSourceFactory for NestenClientFactory {
    fn create(&self, api_key: SecretString) -> Result<Arc<dyn InvoiceSource>> {
        Ok(Arc::new(NestenClient::with_http(
            self.http.clone(),
            api_key,
            &self.config,
        )))
    }
}
