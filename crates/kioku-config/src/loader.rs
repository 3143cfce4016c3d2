// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./kioku.toml` > `~/.config/kioku/kioku.toml` > `/etc/kioku/kioku.toml`
//! with environment variable overrides via the `KIOKU_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KiokuConfig;

/// Load configuration from the standard file hierarchy with env overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kioku/kioku.toml` (system-wide)
/// 3. `~/.config/kioku/kioku.toml` (user XDG config)
/// 4. `./kioku.toml` (local directory)
/// 5. `KIOKU_*` environment variables
pub fn load_config() -> Result<KiokuConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KiokuConfig::default()))
        .merge(Toml::file("/etc/kioku/kioku.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kioku/kioku.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kioku.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file hierarchy).
///
/// Used for testing and for the `--config` CLI flag.
pub fn load_config_from_str(toml_content: &str) -> Result<KiokuConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KiokuConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<KiokuConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KiokuConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that keys containing
/// underscores stay unambiguous: `KIOKU_OPENAI_API_KEY` must map to
/// `openai.api_key`, not `openai.api.key`.
fn env_provider() -> Env {
    Env::prefixed("KIOKU_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("openai_", "openai.", 1)
            .replacen("milvus_", "milvus.", 1)
            .replacen("d1_", "d1.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("upload_", "upload.", 1)
            .replacen("time_", "time.", 1);
        mapped.into()
    })
}
