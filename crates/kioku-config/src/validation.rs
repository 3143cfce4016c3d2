// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all errors instead of failing fast.

use thiserror::Error;

use crate::model::KiokuConfig;

/// One configuration validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Parse(String),

    #[error("{message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or all collected errors.
pub fn validate_config(config: &KiokuConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let addr = config.server.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    let levels = ["trace", "debug", "info", "warn", "error"];
    if !levels.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level must be one of {levels:?}, got `{}`",
                config.server.log_level
            ),
        });
    }

    if config.openai.embedding_dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "openai.embedding_dimensions must be positive".to_string(),
        });
    }

    if config.memory.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.top_k must be at least 1".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.memory.similarity_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.similarity_threshold must be in [0, 1], got {}",
                config.memory.similarity_threshold
            ),
        });
    }

    if let Some(w) = config.memory.min_emotion_weight
        && !(0.0..=1.0).contains(&w)
    {
        errors.push(ConfigError::Validation {
            message: format!("memory.min_emotion_weight must be in [0, 1], got {w}"),
        });
    }

    if config.upload.dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "upload.dir must not be empty".to_string(),
        });
    }

    if config.upload.max_file_bytes == 0 || config.upload.max_audio_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "upload size caps must be positive".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Print collected configuration errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    eprintln!("kioku: configuration is invalid:");
    for err in errors {
        eprintln!("  - {err}");
    }
}
