// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the kioku backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that typos in config
//! keys fail at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level kioku configuration.
///
/// Loaded from TOML files with `KIOKU_` environment variable overrides.
/// Every section is optional and defaults to sensible values; sections for
/// external dependencies default to "not configured", which degrades the
/// matching feature instead of failing startup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KiokuConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI API settings (chat, embeddings, transcription).
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Zilliz/Milvus vector store settings.
    #[serde(default)]
    pub milvus: MilvusConfig,

    /// Cloudflare D1 relational store settings.
    #[serde(default)]
    pub d1: D1Config,

    /// Memory retrieval policy.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// File upload limits and destination.
    #[serde(default)]
    pub upload: UploadConfig,

    /// Time rendering settings.
    #[serde(default)]
    pub time: TimeConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared-secret bearer token checked on every protected route.
    /// `None` disables authentication (development only).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` means the LLM client is not configured.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (overridable for testing and proxies).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat completion model.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector dimensionality (used for the zero-vector fallback).
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Transcription model.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            transcription_model: default_transcription_model(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Zilliz/Milvus vector store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MilvusConfig {
    /// Cluster REST endpoint, e.g. `https://in03-xxxx.api.gcp-us-west1.zillizcloud.com`.
    /// `None` means the vector store is not configured.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API token for the cluster.
    #[serde(default)]
    pub token: Option<String>,

    /// Collection name holding memory records.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            collection: default_collection(),
        }
    }
}

fn default_collection() -> String {
    "kioku_memories".to_string()
}

/// Cloudflare D1 relational store configuration.
///
/// All three credential fields are required for the store to be enabled;
/// a partial set counts as "not configured".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct D1Config {
    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub database_id: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,

    /// Display name reported by the stats endpoint.
    #[serde(default = "default_database_name")]
    pub database_name: String,
}

impl Default for D1Config {
    fn default() -> Self {
        Self {
            account_id: None,
            database_id: None,
            api_token: None,
            database_name: default_database_name(),
        }
    }
}

impl D1Config {
    /// True when all credentials are present.
    pub fn is_configured(&self) -> bool {
        self.account_id.is_some() && self.database_id.is_some() && self.api_token.is_some()
    }
}

fn default_database_name() -> String {
    "kioku_chat_db".to_string()
}

/// Memory retrieval policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Owning user id stamped onto stored memories and used as the
    /// retrieval filter.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// How many similar memories to fetch per turn.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a hit to be kept. Policy, not a
    /// hard architectural constant.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Optional minimum emotion weight filter applied at search time.
    #[serde(default)]
    pub min_emotion_weight: Option<f32>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            min_emotion_weight: None,
        }
    }
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f32 {
    0.7
}

/// File upload limits and destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_upload_dir")]
    pub dir: String,

    /// Cap for image/document uploads, bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Cap for audio uploads sent to transcription, bytes.
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_file_bytes: default_max_file_bytes(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_audio_bytes() -> u64 {
    25 * 1024 * 1024
}

/// Time rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    /// IANA timezone name for human-readable time strings.
    /// Unknown names degrade to UTC with a warning.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}
