// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Cloudflare D1 query API.
//!
//! One endpoint (`POST .../d1/database/{id}/query`), parameterized SQL,
//! exponential backoff on server errors, and row normalization across the
//! two result shapes D1 has been observed to return.

use std::time::Duration;

use kioku_config::model::D1Config;
use kioku_core::KiokuError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Maximum attempts per query, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay; doubles per retry.
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// A normalized result row: column name to JSON value.
pub type Row = Map<String, Value>;

/// One parameterized SQL statement.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Top-level Cloudflare API envelope.
#[derive(Debug, Deserialize)]
struct D1Envelope {
    success: bool,
    #[serde(default)]
    errors: Vec<D1Error>,
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct D1Error {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    results: Value,
}

/// Client for one D1 database.
#[derive(Debug, Clone)]
pub struct D1Client {
    client: reqwest::Client,
    query_url: String,
    configured: bool,
}

impl D1Client {
    /// Builds a client. Missing credentials do not fail construction;
    /// every query against an unconfigured client returns
    /// [`KiokuError::Unavailable`].
    pub fn new(config: &D1Config) -> Result<Self, KiokuError> {
        let configured = config.is_configured();
        let token = config.api_token.clone().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| KiokuError::Config(format!("invalid D1 token value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KiokuError::Storage {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let query_url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/d1/database/{}/query",
            config.account_id.as_deref().unwrap_or_default(),
            config.database_id.as_deref().unwrap_or_default(),
        );

        Ok(Self {
            client,
            query_url,
            configured,
        })
    }

    /// True when account id, database id, and token are all present.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Overrides the query URL (for testing with wiremock).
    pub fn with_query_url(mut self, url: String) -> Self {
        self.query_url = url;
        self.configured = true;
        self
    }

    /// Executes one statement and returns its normalized rows.
    ///
    /// Server errors (5xx) are retried with exponential backoff up to
    /// three attempts; client errors propagate immediately.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>, KiokuError> {
        if !self.configured {
            return Err(KiokuError::Unavailable {
                service: "relational store".to_string(),
            });
        }

        let body = json!({ "sql": sql, "params": params });
        let mut backoff = BACKOFF_BASE;

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                warn!(attempt, "retrying D1 query after server error");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let response = self
                .client
                .post(&self.query_url)
                .json(&body)
                .send()
                .await
                .map_err(|e| KiokuError::Storage {
                    message: format!("D1 request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "D1 response received");

            if status.is_server_error() && attempt < MAX_ATTEMPTS {
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(KiokuError::Storage {
                    message: format!("D1 returned {status}: {text}"),
                    source: None,
                });
            }

            let envelope: D1Envelope =
                serde_json::from_str(&text).map_err(|e| KiokuError::Storage {
                    message: format!("failed to parse D1 response: {e}"),
                    source: Some(Box::new(e)),
                })?;

            if !envelope.success {
                let detail = envelope
                    .errors
                    .first()
                    .map(|e| format!("{} ({})", e.message, e.code))
                    .unwrap_or_else(|| "unknown error".to_string());
                return Err(KiokuError::Storage {
                    message: format!("D1 query rejected: {detail}"),
                    source: None,
                });
            }

            let result = envelope
                .result
                .into_iter()
                .next()
                .ok_or_else(|| KiokuError::Storage {
                    message: "D1 response contained no result".to_string(),
                    source: None,
                })?;
            if !result.success {
                return Err(KiokuError::Storage {
                    message: "D1 statement reported failure".to_string(),
                    source: None,
                });
            }
            return normalize_rows(result.results);
        }

        Err(KiokuError::Storage {
            message: "D1 query failed after retries".to_string(),
            source: None,
        })
    }

    /// Runs statements one after another, stopping at the first failure.
    ///
    /// No transaction wraps the group: statements already applied stay
    /// applied when a later one fails.
    pub async fn execute_batch(&self, statements: &[Statement]) -> Result<(), KiokuError> {
        for statement in statements {
            self.execute(&statement.sql, statement.params.clone())
                .await?;
        }
        Ok(())
    }
}

/// Normalizes the two result shapes D1 returns for `results`:
/// an array of objects, or an object with `columns` and `rows` arrays.
fn normalize_rows(results: Value) -> Result<Vec<Row>, KiokuError> {
    match results {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(KiokuError::Storage {
                    message: format!("unexpected row shape: {other}"),
                    source: None,
                }),
            })
            .collect(),
        Value::Object(mut map) => {
            let columns: Vec<String> = serde_json::from_value(
                map.remove("columns").unwrap_or(Value::Null),
            )
            .map_err(|e| KiokuError::Storage {
                message: format!("columnar result missing column names: {e}"),
                source: Some(Box::new(e)),
            })?;
            let rows: Vec<Vec<Value>> =
                serde_json::from_value(map.remove("rows").unwrap_or(Value::Null)).map_err(
                    |e| KiokuError::Storage {
                        message: format!("columnar result missing rows: {e}"),
                        source: Some(Box::new(e)),
                    },
                )?;

            Ok(rows
                .into_iter()
                .map(|values| columns.iter().cloned().zip(values).collect())
                .collect())
        }
        other => Err(KiokuError::Storage {
            message: format!("unexpected results shape: {other}"),
            source: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_array_of_objects() {
        let rows = normalize_rows(json!([{"id": "a", "n": 1}, {"id": "b", "n": 2}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "b");
    }

    #[test]
    fn normalizes_columnar_shape() {
        let rows = normalize_rows(json!({
            "columns": ["id", "n"],
            "rows": [["a", 1], ["b", 2]]
        }))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "a");
        assert_eq!(rows[1]["n"], 2);
    }

    #[test]
    fn null_results_mean_no_rows() {
        assert!(normalize_rows(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn rejects_scalar_results() {
        assert!(normalize_rows(json!(42)).is_err());
    }
}
