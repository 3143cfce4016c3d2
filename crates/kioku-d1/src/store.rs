// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session persistence over D1.
//!
//! Schema: `chat_sessions(id, title, created_at, updated_at)` and
//! `chat_messages(id, session_id, role, content, timestamp)`. All
//! timestamps are millisecond epoch integers. `updated_at` advances on
//! every title change and message append.

use std::str::FromStr;

use kioku_config::model::D1Config;
use kioku_core::{ChatMessage, ChatSession, KiokuError, MessageMatch, Role, now_ms};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{D1Client, Row, Statement};

/// Title given to sessions created implicitly by a message append.
pub const FALLBACK_SESSION_TITLE: &str = "New conversation";

const DEFAULT_SESSION_LIMIT: usize = 50;
const DEFAULT_MESSAGE_LIMIT: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Aggregate counters reported by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub enabled: bool,
    pub session_count: i64,
    pub message_count: i64,
    pub database_name: String,
}

/// Session and message store backed by [`D1Client`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    client: D1Client,
    database_name: String,
}

impl SessionStore {
    pub fn new(config: &D1Config) -> Result<Self, KiokuError> {
        Ok(Self {
            client: D1Client::new(config)?,
            database_name: config.database_name.clone(),
        })
    }

    /// Replaces the underlying client (for testing with wiremock).
    pub fn with_client(mut self, client: D1Client) -> Self {
        self.client = client;
        self
    }

    /// True when the underlying client has credentials.
    pub fn is_enabled(&self) -> bool {
        self.client.is_configured()
    }

    pub async fn create_session(&self, title: &str) -> Result<ChatSession, KiokuError> {
        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: now_ms(),
            updated_at: now_ms(),
        };
        self.client
            .execute(
                "INSERT INTO chat_sessions (id, title, created_at, updated_at) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    json!(session.id),
                    json!(session.title),
                    json!(session.created_at),
                    json!(session.updated_at),
                ],
            )
            .await?;
        info!(session_id = %session.id, "chat session created");
        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, KiokuError> {
        let rows = self
            .client
            .execute(
                "SELECT id, title, created_at, updated_at FROM chat_sessions WHERE id = ?",
                vec![json!(id)],
            )
            .await?;
        rows.into_iter().next().map(session_from_row).transpose()
    }

    /// Sessions ordered by most recently updated.
    pub async fn list_sessions(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<ChatSession>, KiokuError> {
        let rows = self
            .client
            .execute(
                "SELECT id, title, created_at, updated_at FROM chat_sessions \
                 ORDER BY updated_at DESC LIMIT ?",
                vec![json!(limit.unwrap_or(DEFAULT_SESSION_LIMIT))],
            )
            .await?;
        rows.into_iter().map(session_from_row).collect()
    }

    /// Retitles a session, or just touches `updated_at` when no title is
    /// given. Returns false when the session does not exist.
    pub async fn update_session(
        &self,
        id: &str,
        title: Option<&str>,
    ) -> Result<bool, KiokuError> {
        if self.get_session(id).await?.is_none() {
            return Ok(false);
        }
        let now = now_ms();
        match title {
            Some(title) => {
                self.client
                    .execute(
                        "UPDATE chat_sessions SET title = ?, updated_at = ? WHERE id = ?",
                        vec![json!(title), json!(now), json!(id)],
                    )
                    .await?;
            }
            None => {
                self.client
                    .execute(
                        "UPDATE chat_sessions SET updated_at = ? WHERE id = ?",
                        vec![json!(now), json!(id)],
                    )
                    .await?;
            }
        }
        Ok(true)
    }

    /// Deletes a session and its messages. Messages go first so a partial
    /// failure never leaves orphaned messages behind a deleted session.
    pub async fn delete_session(&self, id: &str) -> Result<bool, KiokuError> {
        if self.get_session(id).await?.is_none() {
            return Ok(false);
        }
        self.client
            .execute_batch(&[
                Statement::new(
                    "DELETE FROM chat_messages WHERE session_id = ?",
                    vec![json!(id)],
                ),
                Statement::new("DELETE FROM chat_sessions WHERE id = ?", vec![json!(id)]),
            ])
            .await?;
        info!(session_id = %id, "chat session deleted");
        Ok(true)
    }

    /// Appends a message, creating a fallback session when the given id is
    /// absent or unknown. Returns the message and the created session, if
    /// one was created.
    pub async fn add_message(
        &self,
        session_id: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<(ChatMessage, Option<ChatSession>), KiokuError> {
        let (target_id, created) = match session_id {
            Some(id) if self.get_session(id).await?.is_some() => (id.to_string(), None),
            other => {
                if let Some(id) = other {
                    debug!(session_id = %id, "unknown session id, creating fallback session");
                }
                let session = self.create_session(FALLBACK_SESSION_TITLE).await?;
                (session.id.clone(), Some(session))
            }
        };

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: target_id.clone(),
            role,
            content: content.to_string(),
            timestamp: now_ms(),
        };

        // Insert plus parent touch; no transaction, insert goes first.
        self.client
            .execute_batch(&[
                Statement::new(
                    "INSERT INTO chat_messages (id, session_id, role, content, timestamp) \
                     VALUES (?, ?, ?, ?, ?)",
                    vec![
                        json!(message.id),
                        json!(message.session_id),
                        json!(role.to_string()),
                        json!(message.content),
                        json!(message.timestamp),
                    ],
                ),
                Statement::new(
                    "UPDATE chat_sessions SET updated_at = ? WHERE id = ?",
                    vec![json!(message.timestamp), json!(target_id)],
                ),
            ])
            .await?;

        Ok((message, created))
    }

    /// Messages of one session in chronological order.
    pub async fn list_messages(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatMessage>, KiokuError> {
        let rows = self
            .client
            .execute(
                "SELECT id, session_id, role, content, timestamp FROM chat_messages \
                 WHERE session_id = ? ORDER BY timestamp ASC LIMIT ?",
                vec![json!(session_id), json!(limit.unwrap_or(DEFAULT_MESSAGE_LIMIT))],
            )
            .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    /// Substring search over message content, newest first, joined with
    /// the owning session's title.
    pub async fn search_messages(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageMatch>, KiokuError> {
        let rows = self
            .client
            .execute(
                "SELECT m.id, m.session_id, m.role, m.content, m.timestamp, s.title \
                 FROM chat_messages m JOIN chat_sessions s ON m.session_id = s.id \
                 WHERE m.content LIKE ? ORDER BY m.timestamp DESC LIMIT ?",
                vec![
                    json!(format!("%{query}%")),
                    json!(limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
                ],
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                let title = row_str(&row, "title")?;
                Ok(MessageMatch {
                    message: message_from_row(row)?,
                    session_title: title,
                })
            })
            .collect()
    }

    pub async fn message_count(&self, session_id: &str) -> Result<i64, KiokuError> {
        let rows = self
            .client
            .execute(
                "SELECT COUNT(*) as count FROM chat_messages WHERE session_id = ?",
                vec![json!(session_id)],
            )
            .await?;
        rows.first().map(|row| row_i64(row, "count")).unwrap_or(Ok(0))
    }

    pub async fn stats(&self) -> Result<StoreStats, KiokuError> {
        if !self.is_enabled() {
            return Ok(StoreStats {
                enabled: false,
                session_count: 0,
                message_count: 0,
                database_name: self.database_name.clone(),
            });
        }
        let sessions = self
            .client
            .execute("SELECT COUNT(*) as count FROM chat_sessions", vec![])
            .await?;
        let messages = self
            .client
            .execute("SELECT COUNT(*) as count FROM chat_messages", vec![])
            .await?;
        Ok(StoreStats {
            enabled: true,
            session_count: sessions.first().map(|r| row_i64(r, "count")).unwrap_or(Ok(0))?,
            message_count: messages.first().map(|r| row_i64(r, "count")).unwrap_or(Ok(0))?,
            database_name: self.database_name.clone(),
        })
    }
}

fn session_from_row(row: Row) -> Result<ChatSession, KiokuError> {
    Ok(ChatSession {
        id: row_str(&row, "id")?,
        title: row_str(&row, "title")?,
        created_at: row_i64(&row, "created_at")?,
        updated_at: row_i64(&row, "updated_at")?,
    })
}

fn message_from_row(row: Row) -> Result<ChatMessage, KiokuError> {
    let role_raw = row_str(&row, "role")?;
    let role = Role::from_str(&role_raw).map_err(|_| KiokuError::Storage {
        message: format!("unknown message role: {role_raw}"),
        source: None,
    })?;
    Ok(ChatMessage {
        id: row_str(&row, "id")?,
        session_id: row_str(&row, "session_id")?,
        role,
        content: row_str(&row, "content")?,
        timestamp: row_i64(&row, "timestamp")?,
    })
}

fn row_str(row: &Row, key: &str) -> Result<String, KiokuError> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| KiokuError::Storage {
            message: format!("row missing string column {key}"),
            source: None,
        })
}

fn row_i64(row: &Row, key: &str) -> Result<i64, KiokuError> {
    row.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| KiokuError::Storage {
            message: format!("row missing integer column {key}"),
            source: None,
        })
}
