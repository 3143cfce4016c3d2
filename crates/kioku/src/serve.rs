// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kioku serve` command implementation.
//!
//! Wires every service into an [`AppContext`] once at startup and hands
//! it to the gateway. Missing credentials never abort startup: the
//! matching feature degrades and a single warning says so.

use kioku_agent::Orchestrator;
use kioku_analysis::TimeProvider;
use kioku_config::model::KiokuConfig;
use kioku_core::KiokuError;
use kioku_d1::SessionStore;
use kioku_gateway::AppContext;
use kioku_llm::OpenAiClient;
use kioku_vector::VectorMemoryStore;
use tracing::{info, warn};

/// Runs the `kioku serve` command.
pub async fn run_serve(config: KiokuConfig) -> Result<(), KiokuError> {
    init_tracing(&config.server.log_level);

    info!("starting kioku serve");

    let ctx = build_context(config)?;
    warn_missing_credentials(&ctx);

    kioku_gateway::start_server(ctx).await
}

/// Constructs all services and the shared context. The only place in the
/// binary where services are created; handlers receive them by injection.
fn build_context(config: KiokuConfig) -> Result<AppContext, KiokuError> {
    let llm = OpenAiClient::new(&config.openai)?;
    let vector = VectorMemoryStore::new(&config.milvus, &config.memory)?;
    let sessions = SessionStore::new(&config.d1)?;
    let time = TimeProvider::new(&config.time.timezone);

    let orchestrator = Orchestrator::new(
        llm.clone(),
        vector.clone(),
        sessions.clone(),
        time.clone(),
        &config.memory,
    );

    Ok(AppContext {
        orchestrator,
        sessions,
        vector,
        llm,
        time,
        config,
    })
}

/// One warning per missing credential set, at startup only.
fn warn_missing_credentials(ctx: &AppContext) {
    if !ctx.llm.is_configured() {
        warn!("openai.api_key is not set -- chat replies will degrade to the fallback message");
    }
    if !ctx.vector.is_configured() {
        warn!("milvus endpoint/token are not set -- long-term memory is disabled");
    }
    if !ctx.sessions.is_enabled() {
        warn!("d1 credentials are not set -- session endpoints will return 503");
    }
    if ctx.config.server.bearer_token.is_none() {
        warn!("server.bearer_token is not set -- API authentication is disabled");
    }
}

/// Prints the resolved configuration with secrets redacted.
pub fn print_config_summary(config: &KiokuConfig) {
    println!("kioku configuration:");
    println!("  server: {}:{}", config.server.host, config.server.port);
    println!("  log level: {}", config.server.log_level);
    println!(
        "  auth: {}",
        if config.server.bearer_token.is_some() {
            "bearer token"
        } else {
            "disabled"
        }
    );
    println!(
        "  openai: {} (chat={}, embedding={} dim {})",
        if config.openai.api_key.is_some() {
            "configured"
        } else {
            "not configured"
        },
        config.openai.chat_model,
        config.openai.embedding_model,
        config.openai.embedding_dimensions,
    );
    println!(
        "  vector store: {} (collection={})",
        if config.milvus.endpoint.is_some() && config.milvus.token.is_some() {
            "configured"
        } else {
            "not configured"
        },
        config.milvus.collection,
    );
    println!(
        "  d1: {} (database={})",
        if config.d1.is_configured() {
            "configured"
        } else {
            "not configured"
        },
        config.d1.database_name,
    );
    println!(
        "  memory: user={} top_k={} threshold={}",
        config.memory.user_id, config.memory.top_k, config.memory.similarity_threshold,
    );
    println!(
        "  uploads: dir={} file_cap={}B audio_cap={}B",
        config.upload.dir, config.upload.max_file_bytes, config.upload.max_audio_bytes,
    );
    println!("  timezone: {}", config.time.timezone);
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},hyper=warn,reqwest=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_context() {
        let ctx = build_context(KiokuConfig::default()).unwrap();
        assert!(!ctx.llm.is_configured());
        assert!(!ctx.vector.is_configured());
        assert!(!ctx.sessions.is_enabled());
    }
}
