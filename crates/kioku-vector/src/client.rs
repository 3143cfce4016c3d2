// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Zilliz Cloud / Milvus REST v2 API.

use std::time::Duration;

use kioku_config::model::MilvusConfig;
use kioku_core::KiokuError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// Remote responses carry a `code` field; zero means success.
const ENVELOPE_OK: i64 = 0;

/// Response envelope shared by every vectordb endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// One row returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRow {
    #[serde(default)]
    pub text: String,
    pub distance: f32,
    #[serde(default)]
    pub interaction_type: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Client for the Milvus entity endpoints (insert, search, delete) and
/// the collection describe probe.
#[derive(Debug, Clone)]
pub struct MilvusClient {
    client: reqwest::Client,
    base_url: String,
    configured: bool,
}

impl MilvusClient {
    /// Builds a client. Missing endpoint or token does not fail
    /// construction; calls against an unconfigured client error and the
    /// wrapping store degrades.
    pub fn new(config: &MilvusConfig) -> Result<Self, KiokuError> {
        let configured = config.endpoint.is_some() && config.token.is_some();
        let token = config.token.clone().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| KiokuError::Config(format!("invalid vector token value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KiokuError::Vector {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            configured,
        })
    }

    /// True when both endpoint and token were supplied.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self.configured = true;
        self
    }

    /// Inserts entity rows into a collection.
    pub async fn insert(&self, collection: &str, rows: Vec<Value>) -> Result<(), KiokuError> {
        let body = json!({ "collectionName": collection, "data": rows });
        self.post("/v2/vectordb/entities/insert", &body).await?;
        Ok(())
    }

    /// Runs a similarity search and returns the raw scored rows.
    pub async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<SearchRow>, KiokuError> {
        let mut body = json!({
            "collectionName": collection,
            "data": [embedding],
            "annsField": "embedding",
            "limit": limit,
            "outputFields": ["text", "interaction_type", "timestamp"],
        });
        if let Some(expr) = filter {
            body["filter"] = json!(expr);
        }

        let data = self.post("/v2/vectordb/entities/search", &body).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(data).map_err(|e| KiokuError::Vector {
            message: format!("failed to parse search rows: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Deletes all entities matching a filter expression.
    pub async fn delete(&self, collection: &str, filter: &str) -> Result<(), KiokuError> {
        let body = json!({ "collectionName": collection, "filter": filter });
        self.post("/v2/vectordb/entities/delete", &body).await?;
        Ok(())
    }

    /// Liveness probe: describes the collection.
    pub async fn describe_collection(&self, collection: &str) -> Result<(), KiokuError> {
        let body = json!({ "collectionName": collection });
        self.post("/v2/vectordb/collections/describe", &body).await?;
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, KiokuError> {
        if !self.configured {
            return Err(KiokuError::Unavailable {
                service: "vector store".to_string(),
            });
        }

        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| KiokuError::Vector {
                message: format!("request to {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, path, "vector store response");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KiokuError::Vector {
                message: format!("{path} returned {status}: {text}"),
                source: None,
            });
        }

        let envelope: Envelope = response.json().await.map_err(|e| KiokuError::Vector {
            message: format!("failed to parse {path} response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if envelope.code != ENVELOPE_OK {
            return Err(KiokuError::Vector {
                message: format!(
                    "{path} rejected with code {}: {}",
                    envelope.code,
                    envelope.message.unwrap_or_default()
                ),
                source: None,
            });
        }
        Ok(envelope.data)
    }
}
