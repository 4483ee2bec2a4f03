//! REST backend client.
//!
//! | Operation       | Route                               |
//! |-----------------|-------------------------------------|
//! | `create`        | `POST /transaction`                 |
//! | `find_by_id`    | `GET  /transaction/{id}`            |
//! | `find_by_hash`  | `GET  /transaction/by-hash/{hash}`  |
//! | `add_witness`   | `PUT  /transaction/signer/{id}`     |
//! | `mark_sent`     | `POST /transaction/send/{id}`       |
//! | `mark_verified` | `POST /transaction/verify/{id}`     |
//!
//! Every request carries the session headers. Write routes answer with an
//! acknowledgement only, so the record is fetched again afterwards.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::record::{normalize_hash, CreateTransactionPayload, TransactionRecord};
use super::TransactionStore;
use crate::auth::Session;
use crate::config::ClientConfig;
use crate::error::{Result, VaultError};
use crate::primitives::{Address, TxId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client errors other than timeouts and rate limiting mean the request
/// itself is wrong; retrying it cannot help.
fn is_rejection(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
}

/// [`TransactionStore`] backed by the vault REST API.
pub struct HttpTransactionStore {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpTransactionStore {
    /// Creates a client for the API at `api_url`, authenticated as `session`.
    pub fn new(api_url: impl Into<String>, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VaultError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            base_url: api_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Creates a client for [`ClientConfig::api_url`].
    pub fn from_config(config: &ClientConfig, session: Session) -> Result<Self> {
        Self::new(config.api_url.clone(), session)
    }

    /// The session requests are sent as.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/transaction{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        self.session
            .headers()
            .into_iter()
            .fold(request, |req, (name, value)| req.header(name, value))
    }

    async fn send(&self, request: RequestBuilder, key: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| VaultError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::RecordNotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, key, "backend request failed");
            let message = format!("{}: {}", status, body);
            return Err(if is_rejection(status) {
                VaultError::BackendRejected(message)
            } else {
                VaultError::Backend(message)
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| VaultError::Backend(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TransactionStore for HttpTransactionStore {
    async fn create(&self, draft: CreateTransactionPayload) -> Result<TransactionRecord> {
        debug!(hash = %draft.hash, "creating backend record");
        let key = draft.hash.clone();
        let response = self
            .send(self.client.post(self.url("")).json(&draft), &key)
            .await?;
        Self::decode(response).await
    }

    async fn find_by_id(&self, id: &str) -> Result<TransactionRecord> {
        let response = self
            .send(self.client.get(self.url(&format!("/{}", id))), id)
            .await?;
        Self::decode(response).await
    }

    async fn find_by_hash(&self, hash: &str) -> Result<TransactionRecord> {
        let hash = normalize_hash(hash);
        let response = self
            .send(
                self.client.get(self.url(&format!("/by-hash/{}", hash))),
                &hash,
            )
            .await?;
        Self::decode(response).await
    }

    async fn add_witness(
        &self,
        id: &str,
        account: &Address,
        signature: Option<&str>,
        confirm: bool,
    ) -> Result<TransactionRecord> {
        let body = json!({
            "account": account,
            "signer": signature,
            "confirm": confirm,
        });
        self.send(
            self.client.put(self.url(&format!("/signer/{}", id))).json(&body),
            id,
        )
        .await?;
        self.find_by_id(id).await
    }

    async fn mark_sent(&self, id: &str, chain_tx_id: &TxId) -> Result<TransactionRecord> {
        let body = json!({ "chainTxId": chain_tx_id });
        self.send(
            self.client.post(self.url(&format!("/send/{}", id))).json(&body),
            id,
        )
        .await?;
        self.find_by_id(id).await
    }

    async fn mark_verified(&self, id: &str) -> Result<TransactionRecord> {
        self.send(self.client.post(self.url(&format!("/verify/{}", id))), id)
            .await?;
        self.find_by_id(id).await
    }
}
