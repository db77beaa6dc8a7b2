//! Ledger gateway reached over HTTP/JSON.
//!
//! Routes (relative to the configured base URL):
//! - `GET  health`
//! - `POST documents`                          body: `LedgerRecord`, reply: `TxReceipt`
//! - `GET  documents/by-fingerprint/{hex64}`   reply: `LedgerRecord`
//! - `GET  documents/by-name/{name}`           reply: `LedgerRecord`
//!
//! Status mapping:
//! - transport failure, 5xx, 408 or 429: `LedgerUnavailable`
//! - 404 on a query: not found
//! - 409 on submit: `DuplicateRecord` (body may carry the existing record)
//! - anything else unexpected, or an undecodable body: `LedgerProtocol`
//!
//! No retries and no client-side timeouts; callers own their deadlines.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use notary_core::{NotaryError, NotaryResult};

use crate::constants::{user_agent, PATH_BY_FINGERPRINT, PATH_BY_NAME, PATH_DOCUMENTS, PATH_HEALTH};
use crate::ledger::{LedgerClient, LedgerRecord, TxReceipt};

#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    base: Url,
}

impl HttpLedger {
    pub fn new(base_url: &str) -> NotaryResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| NotaryError::invalid_argument(format!("invalid ledger url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(NotaryError::invalid_argument(format!(
                "ledger url cannot be a base: {base_url}"
            )));
        }
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|e| NotaryError::ledger_unavailable(format!("http client: {e}")))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> NotaryResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NotaryError::invalid_argument("ledger url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch(&self, req: reqwest::RequestBuilder) -> NotaryResult<(StatusCode, Vec<u8>)> {
        let resp = req
            .send()
            .await
            .map_err(|e| NotaryError::ledger_unavailable(format!("ledger request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| NotaryError::ledger_unavailable(format!("ledger response interrupted: {e}")))?;
        Ok((status, body.to_vec()))
    }

    async fn query(&self, url: Url) -> NotaryResult<Option<LedgerRecord>> {
        debug!(%url, "ledger query");
        let (status, body) = self.fetch(self.client.get(url)).await?;
        map_query_response(status, &body)
    }
}

/// Interpret a reply to `POST documents`.
pub fn map_submit_response(status: StatusCode, body: &[u8], fingerprint: &str) -> NotaryResult<TxReceipt> {
    if status.is_success() {
        return serde_json::from_slice::<TxReceipt>(body)
            .map_err(|e| NotaryError::ledger_protocol(format!("invalid submit receipt: {e}")));
    }
    if status == StatusCode::CONFLICT {
        let existing = serde_json::from_slice::<LedgerRecord>(body)
            .ok()
            .and_then(|r| r.into_document().ok());
        return Err(NotaryError::duplicate(fingerprint, existing));
    }
    Err(status_error(status, body))
}

/// Interpret a reply to a by-fingerprint or by-name query.
pub fn map_query_response(status: StatusCode, body: &[u8]) -> NotaryResult<Option<LedgerRecord>> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status.is_success() {
        return serde_json::from_slice::<LedgerRecord>(body)
            .map(Some)
            .map_err(|e| NotaryError::ledger_protocol(format!("invalid ledger record: {e}")));
    }
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: &[u8]) -> NotaryError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
    let transient = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;
    if transient {
        NotaryError::ledger_unavailable(format!("ledger returned {status}: {snippet}"))
    } else {
        NotaryError::ledger_protocol(format!("unexpected ledger status {status}: {snippet}"))
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    fn backend(&self) -> &'static str {
        "http"
    }

    async fn ping(&self) -> NotaryResult<()> {
        let url = self.endpoint(&[PATH_HEALTH])?;
        let (status, body) = self.fetch(self.client.get(url)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, &body))
        }
    }

    async fn submit_document(&self, record: &LedgerRecord) -> NotaryResult<TxReceipt> {
        let url = self.endpoint(&[PATH_DOCUMENTS])?;
        debug!(%url, fingerprint = %record.fingerprint, "ledger submit");
        let (status, body) = self.fetch(self.client.post(url).json(record)).await?;
        map_submit_response(status, &body, &record.fingerprint)
    }

    async fn get_document_by_fingerprint(&self, fingerprint: &str) -> NotaryResult<Option<LedgerRecord>> {
        let url = self.endpoint(&[PATH_DOCUMENTS, PATH_BY_FINGERPRINT, fingerprint])?;
        self.query(url).await
    }

    async fn get_document_by_name(&self, name: &str) -> NotaryResult<Option<LedgerRecord>> {
        let url = self.endpoint(&[PATH_DOCUMENTS, PATH_BY_NAME, name])?;
        self.query(url).await
    }
}
