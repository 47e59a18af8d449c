//! Horizon REST client backed by `reqwest`.
//!
//! Horizon streams over server-sent events, but a plain cursor poll gives the
//! same ordered, resumable sequence and keeps the client stateless: the
//! subscription is just "fetch the page after the last paging token, repeat".

use std::sync::Arc;

use async_trait::async_trait;
use futures::{channel::mpsc, SinkExt};
use ledgerstream_core::client::{LedgerClient, LedgerRequest, LedgerStream, Order, TransactionRequest, TransactionsPage};
use ledgerstream_core::error::IngestError;
use ledgerstream_core::types::{LedgerHeader, TransactionRecord};
use serde::de::DeserializeOwned;

use crate::config::HorizonConfig;
use crate::error::HorizonError;
use crate::hal::{LedgerRecord, Page};
use crate::retry::RetryPolicy;

/// Horizon client with built-in retry.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct HorizonClient {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    config: HorizonConfig,
}

impl HorizonClient {
    pub fn new(config: HorizonConfig) -> Result<Self, HorizonError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| HorizonError::Http(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                base_url: config.url.trim_end_matches('/').to_string(),
                http,
                retry: RetryPolicy::new(config.retry.clone()),
                config,
            }),
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, HorizonError> {
        Self::new(HorizonConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.inner.base_url
    }

    /// One page of ledgers after `cursor`.
    pub async fn ledgers_page(
        &self,
        cursor: &str,
        order: Order,
        limit: u32,
    ) -> Result<Vec<LedgerHeader>, HorizonError> {
        self.inner.ledgers_page(cursor, order, limit).await
    }
}

impl Inner {
    async fn ledgers_page(
        &self,
        cursor: &str,
        order: Order,
        limit: u32,
    ) -> Result<Vec<LedgerHeader>, HorizonError> {
        let query = [
            ("cursor", cursor.to_string()),
            ("order", order.to_string()),
            ("limit", limit.to_string()),
        ];
        let page: Page<LedgerRecord> = self.get_json("/ledgers", &query).await?;
        Ok(page.into_records().into_iter().map(Into::into).collect())
    }

    async fn transactions_page(&self, request: &TransactionRequest) -> Result<TransactionsPage, HorizonError> {
        let mut query = vec![
            ("order", Order::Asc.to_string()),
            ("limit", request.limit.max(1).to_string()),
        ];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", cursor.clone()));
        }
        let path = format!("/ledgers/{}/transactions", request.for_ledger);
        let page: Page<TransactionRecord> = self.get_json(&path, &query).await?;
        let records = page.into_records();
        let next_cursor = records.last().map(|r| r.paging_token.clone());
        Ok(TransactionsPage { records, next_cursor })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HorizonError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.get_once(&url, query).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %url,
                            "retrying Horizon request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, url = %url, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, HorizonError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/hal+json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HorizonError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> HorizonError {
        if e.is_timeout() {
            HorizonError::Timeout {
                ms: self.config.request_timeout_ms,
            }
        } else {
            HorizonError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn stream_ledgers(&self, request: LedgerRequest) -> Result<LedgerStream, IngestError> {
        let limit = self.inner.config.page_limit.max(1);
        // The first page is fetched here so an unreachable server fails the
        // subscription itself rather than its first item.
        let first = self
            .inner
            .ledgers_page(&request.cursor, request.order, limit)
            .await
            .map_err(|e| IngestError::Subscribe(e.to_string()))?;

        tracing::info!(url = %self.inner.base_url, cursor = %request.cursor, "ledger subscription opened");

        let (tx, rx) = mpsc::channel(limit as usize);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            poll_ledgers(inner, request, first, tx).await;
        });

        Ok(Box::pin(rx))
    }

    async fn transactions(&self, request: TransactionRequest) -> Result<TransactionsPage, IngestError> {
        Ok(self.inner.transactions_page(&request).await?)
    }
}

// ─── Internal polling loop ────────────────────────────────────────────────────

async fn poll_ledgers(
    inner: Arc<Inner>,
    request: LedgerRequest,
    first: Vec<LedgerHeader>,
    mut tx: mpsc::Sender<Result<LedgerHeader, IngestError>>,
) {
    let limit = inner.config.page_limit.max(1);
    let mut cursor = request.cursor;
    let mut page = first;

    loop {
        let caught_up = page.len() < limit as usize;
        for header in page.drain(..) {
            cursor = header.paging_token.clone();
            if tx.send(Ok(header)).await.is_err() {
                tracing::debug!(cursor = %cursor, "ledger subscription dropped");
                return;
            }
        }

        if caught_up {
            tokio::time::sleep(inner.config.poll_interval()).await;
        }
        if tx.is_closed() {
            tracing::debug!(cursor = %cursor, "ledger subscription dropped");
            return;
        }

        page = match inner.ledgers_page(&cursor, request.order, limit).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(cursor = %cursor, error = %e, "ledger polling failed");
                let _ = tx.send(Err(IngestError::Subscribe(e.to_string()))).await;
                return;
            }
        };
    }
}
