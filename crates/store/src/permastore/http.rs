//! HTTP client for the permanent storage network gateway
//!
//! A thin wrapper around reqwest adding bearer-token auth with a single
//! refresh-on-401 retry: when a request comes back 401 the client exchanges
//! its API key for a fresh token once and replays the request once. A second
//! 401 is surfaced as an error. No other retry logic exists anywhere in this
//! client.

use super::{owner_tag_value, tags, PermaStore, UploadReceipt};
use async_trait::async_trait;
use linkstash_common::config::AppConfig;
use linkstash_common::errors::{AppError, Result};
use linkstash_common::metrics;
use linkstash_common::models::{DeletionRecord, Document};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct HttpPermaStore {
    client: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: Option<String>,
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    items: Vec<QueryItem<T>>,
}

#[derive(Deserialize)]
struct QueryItem<T> {
    data: T,
}

impl HttpPermaStore {
    /// Create a client from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.permastore.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create storage HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.permastore.base_url.trim_end_matches('/').to_string(),
            token_url: config.permastore_token_url(),
            api_key: config.permastore.api_key.clone(),
            token: RwLock::new(None),
        })
    }

    /// Exchange the API key for a fresh bearer token and cache it
    async fn refresh_token(&self) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or_else(|| AppError::Configuration {
            message: "permastore.api_key not configured".to_string(),
        })?;

        let response = self
            .client
            .post(&self.token_url)
            .json(&serde_json::json!({ "api_key": api_key }))
            .send()
            .await
            .map_err(|e| AppError::Internal {
                message: format!("storage token refresh failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Internal {
                message: format!("storage token endpoint returned {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| AppError::Internal {
            message: format!("malformed token response: {}", e),
        })?;

        *self.token.write().await = Some(body.token.clone());
        Ok(body.token)
    }

    async fn bearer(&self) -> Result<Option<String>> {
        if self.api_key.is_none() {
            // Public gateway mode, no auth expected
            return Ok(None);
        }
        if let Some(token) = self.token.read().await.clone() {
            return Ok(Some(token));
        }
        Ok(Some(self.refresh_token().await?))
    }

    /// Send a request, refreshing the token and replaying once on 401
    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut request = build();
        if let Some(token) = self.bearer().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED && self.api_key.is_some() {
            tracing::debug!("storage token rejected, refreshing once");
            let token = self.refresh_token().await?;
            let response = build().bearer_auth(token).send().await?;
            return Ok(response);
        }

        Ok(response)
    }

    async fn query<T: DeserializeOwned>(&self, doc_type: &str, owner_id: Option<&str>) -> Result<Vec<T>> {
        let url = format!("{}/tx", self.base_url);
        let owner_tag = owner_tag_value(owner_id);

        let response = self
            .send_authorized(|| {
                self.client.get(&url).query(&[
                    (tags::APP_NAME, tags::APP_VALUE),
                    (tags::DOC_TYPE, doc_type),
                    (tags::OWNER_ID, owner_tag.as_str()),
                ])
            })
            .await
            .map_err(|e| AppError::RemoteQuery {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::RemoteQuery {
                message: format!("storage query returned {}", response.status()),
            });
        }

        let body: QueryResponse<T> = response.json().await.map_err(|e| AppError::RemoteQuery {
            message: format!("malformed query response: {}", e),
        })?;

        Ok(body.items.into_iter().map(|item| item.data).collect())
    }

    async fn upload<T: serde::Serialize>(
        &self,
        doc_type: &str,
        owner_id: Option<&str>,
        payload: &T,
    ) -> Result<UploadReceipt> {
        let url = format!("{}/tx", self.base_url);
        let body = serde_json::json!({
            "tags": {
                tags::APP_NAME: tags::APP_VALUE,
                tags::DOC_TYPE: doc_type,
                tags::OWNER_ID: owner_tag_value(owner_id),
            },
            "data": payload,
        });

        let response = self
            .send_authorized(|| self.client.post(&url).json(&body))
            .await
            .map_err(|e| AppError::Upload {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upload {
                message: format!("storage upload returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| AppError::Upload {
            message: format!("malformed upload receipt: {}", e),
        })
    }
}

#[async_trait]
impl PermaStore for HttpPermaStore {
    async fn upload_document(&self, document: &Document) -> Result<UploadReceipt> {
        let start = Instant::now();
        let result = self
            .upload(tags::TYPE_BOOKMARK, document.owner_id.as_deref(), document)
            .await;
        metrics::record_permastore(start.elapsed().as_secs_f64(), "upload_document", result.is_ok());
        result
    }

    async fn upload_deletion(&self, record: &DeletionRecord) -> Result<UploadReceipt> {
        let start = Instant::now();
        let result = self
            .upload(tags::TYPE_DELETION, Some(record.owner_id.as_str()), record)
            .await;
        metrics::record_permastore(start.elapsed().as_secs_f64(), "upload_deletion", result.is_ok());
        result
    }

    async fn query_documents(&self, owner_id: Option<&str>) -> Result<Vec<Document>> {
        let start = Instant::now();
        let result = self.query(tags::TYPE_BOOKMARK, owner_id).await;
        metrics::record_permastore(start.elapsed().as_secs_f64(), "query_documents", result.is_ok());
        result
    }

    async fn query_deletions(&self, owner_id: Option<&str>) -> Result<Vec<DeletionRecord>> {
        let start = Instant::now();
        let result = self.query(tags::TYPE_DELETION, owner_id).await;
        metrics::record_permastore(start.elapsed().as_secs_f64(), "query_deletions", result.is_ok());
        result
    }
}
