// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degrading vector memory store.
//!
//! Wraps [`MilvusClient`] with the chat-turn tolerance policy: writes
//! report success as a bool, reads fall back to empty on any failure.
//! The store is never the reason a turn errors.

use kioku_config::model::{MemoryConfig, MilvusConfig};
use kioku_core::{KiokuError, MemoryHit, MemoryRecord, StepStatus};
use serde_json::json;
use tracing::{debug, warn};

use crate::client::MilvusClient;

/// Policy-carrying wrapper over the raw Milvus client.
#[derive(Debug, Clone)]
pub struct VectorMemoryStore {
    client: MilvusClient,
    collection: String,
    similarity_threshold: f32,
    min_emotion_weight: Option<f32>,
}

impl VectorMemoryStore {
    pub fn new(milvus: &MilvusConfig, memory: &MemoryConfig) -> Result<Self, KiokuError> {
        Ok(Self {
            client: MilvusClient::new(milvus)?,
            collection: milvus.collection.clone(),
            similarity_threshold: memory.similarity_threshold,
            min_emotion_weight: memory.min_emotion_weight,
        })
    }

    /// Replaces the underlying client (for testing with wiremock).
    pub fn with_client(mut self, client: MilvusClient) -> Self {
        self.client = client;
        self
    }

    /// True when the underlying client has credentials.
    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Writes one memory record. Errors are logged and swallowed; the
    /// return value reports whether the write landed.
    pub async fn store(&self, record: &MemoryRecord) -> bool {
        let row = json!({
            "text": record.text,
            "embedding": record.embedding,
            "timestamp": record.timestamp,
            "user_id": record.user_id,
            "emotion_weight": record.emotion_weight,
            "category": record.category,
            "interaction_type": record.interaction_type,
        });

        match self.client.insert(&self.collection, vec![row]).await {
            Ok(()) => {
                debug!(
                    user_id = %record.user_id,
                    category = %record.category,
                    "memory stored"
                );
                true
            }
            Err(e) if e.is_unavailable() => {
                debug!("vector store unconfigured, skipping memory write");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to store memory");
                false
            }
        }
    }

    /// Similarity search scoped to one user. Hits below the similarity
    /// threshold are discarded; any failure yields an empty result tagged
    /// `Degraded` so the substitution stays visible to the caller.
    pub async fn search(
        &self,
        embedding: &[f32],
        user_id: &str,
        limit: usize,
    ) -> (Vec<MemoryHit>, StepStatus) {
        let mut filter = format!("user_id == \"{}\"", escape_filter_value(user_id));
        if let Some(min) = self.min_emotion_weight {
            filter.push_str(&format!(" and emotion_weight >= {min}"));
        }

        let rows = match self
            .client
            .search(&self.collection, embedding, limit, Some(&filter))
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_unavailable() => {
                debug!("vector store unconfigured, returning no memories");
                return (Vec::new(), StepStatus::Degraded);
            }
            Err(e) => {
                warn!(error = %e, "memory search failed, returning no memories");
                return (Vec::new(), StepStatus::Degraded);
            }
        };

        let hits = rows
            .into_iter()
            .filter(|row| row.distance >= self.similarity_threshold)
            .take(limit)
            .map(|row| MemoryHit {
                text: row.text,
                score: row.distance,
                interaction_type: row.interaction_type,
                timestamp: row.timestamp,
            })
            .collect();
        (hits, StepStatus::Ok)
    }

    /// Deletes every memory belonging to `user_id`.
    pub async fn clear(&self, user_id: &str) -> bool {
        let filter = format!("user_id == \"{}\"", escape_filter_value(user_id));
        match self.client.delete(&self.collection, &filter).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, user_id, "failed to clear memories");
                false
            }
        }
    }

    /// Liveness probe against the collection.
    pub async fn health_check(&self) -> bool {
        if !self.client.is_configured() {
            return false;
        }
        match self.client.describe_collection(&self.collection).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "vector store health check failed");
                false
            }
        }
    }
}

/// Strips characters that would break out of a quoted filter literal.
fn escape_filter_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect()
}
