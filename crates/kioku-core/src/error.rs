// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the kioku chat-memory backend.

use thiserror::Error;

/// The primary error type used across all kioku crates.
#[derive(Debug, Error)]
pub enum KiokuError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relational store errors (D1 query failure, malformed rows).
    #[error("storage error: {message}")]
    Storage {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector store errors (Milvus/Zilliz API failure, bad envelope).
    #[error("vector store error: {message}")]
    Vector {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, token limits, transcription failure).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request validation errors (bad role, empty content, oversize upload).
    #[error("validation error: {0}")]
    Validation(String),

    /// An external dependency is not configured; the operation cannot run.
    #[error("{service} is not configured")]
    Unavailable { service: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KiokuError {
    /// True when the error means a dependency is missing credentials,
    /// which the HTTP layer maps to 503.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, KiokuError::Unavailable { .. })
    }
}
