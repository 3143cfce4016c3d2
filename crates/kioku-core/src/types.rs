// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types for sessions, messages, memories, and analysis results.
//!
//! All persisted timestamps are millisecond epoch integers. Human-readable
//! time strings only appear in derived context fields, never in storage.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Returns the current wall-clock time as a millisecond epoch integer.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Who authored a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A named, ordered container of chat messages.
///
/// Invariant: `updated_at >= created_at`; `updated_at` advances whenever a
/// message is appended or the title changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Opaque, globally unique identifier.
    pub id: String,
    /// Human-readable, mutable title.
    pub title: String,
    /// Millisecond epoch.
    pub created_at: i64,
    /// Millisecond epoch.
    pub updated_at: i64,
}

/// One turn of a conversation, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    /// Non-empty text.
    pub content: String,
    /// Millisecond epoch; ordering within a session follows this field.
    pub timestamp: i64,
}

/// A search hit from the relational store's text search, carrying the
/// owning session's title alongside the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMatch {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub session_title: String,
}

/// An entry written to the vector store. Append-only; related to
/// [`ChatMessage`] by convention only, with no foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Free-form text, usually prefixed with the speaking role.
    pub text: String,
    /// Fixed-dimension embedding vector.
    pub embedding: Vec<f32>,
    /// Millisecond epoch.
    pub timestamp: i64,
    /// Owning user identifier (bulk-delete filter key).
    pub user_id: String,
    /// Sentiment-derived scalar in [0, 1].
    pub emotion_weight: f32,
    /// Event category label, or "general"/"response".
    pub category: String,
    /// e.g. "user_message", "assistant_message".
    pub interaction_type: String,
}

/// A vector-search result annotated with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHit {
    pub text: String,
    /// Cosine similarity to the query embedding.
    pub score: f32,
    pub interaction_type: String,
    /// Millisecond epoch of the stored record.
    pub timestamp: i64,
}

/// Sentiment scores for one piece of text. Pure function of the input;
/// embedded into records and logs, never persisted standalone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub positive: f32,
    pub negative: f32,
    pub neutral: f32,
    /// Overall polarity in [-1, 1].
    pub compound: f32,
    /// `|compound|`, used to bias memory storage and retrieval.
    pub emotion_weight: f32,
}

impl EmotionAnalysis {
    /// The all-neutral result substituted when analysis fails or the
    /// input is empty.
    pub fn neutral_default() -> Self {
        Self {
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
            compound: 0.0,
            emotion_weight: 0.0,
        }
    }
}

/// Outcome tag for one fallible step of a chat turn.
///
/// The orchestration layer favors "always answer the user" over "fail
/// loudly"; this tag keeps the substituted defaults visible in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step produced a real result.
    Ok,
    /// Step failed and a safe placeholder value was substituted.
    Degraded,
    /// Step failed with no useful substitute (background writes only).
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::User, Role::Assistant] {
            let s = role.to_string();
            assert_eq!(Role::from_str(&s).unwrap(), role);
        }
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn role_rejects_unknown_values() {
        assert!(Role::from_str("system").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn role_serde_uses_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn chat_message_serializes_timestamp_as_integer() {
        let msg = ChatMessage {
            id: "m-1".into(),
            session_id: "s-1".into(),
            role: Role::User,
            content: "hello".into(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["timestamp"], serde_json::json!(1_700_000_000_000_i64));
    }

    #[test]
    fn message_match_flattens_message_fields() {
        let m = MessageMatch {
            message: ChatMessage {
                id: "m-1".into(),
                session_id: "s-1".into(),
                role: Role::Assistant,
                content: "hi".into(),
                timestamp: 1,
            },
            session_title: "First chat".into(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["id"], "m-1");
        assert_eq!(json["session_title"], "First chat");
    }

    #[test]
    fn neutral_default_has_zero_weight() {
        let e = EmotionAnalysis::neutral_default();
        assert_eq!(e.neutral, 1.0);
        assert_eq!(e.compound, 0.0);
        assert_eq!(e.emotion_weight, 0.0);
    }

    #[test]
    fn now_ms_is_millisecond_scale() {
        let ts = now_ms();
        // Past 2020-01-01 in milliseconds, i.e. clearly not a seconds value.
        assert!(ts > 1_577_836_800_000);
    }
}
