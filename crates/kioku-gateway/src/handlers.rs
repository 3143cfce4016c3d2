// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST handlers for chat, sessions, search, stats, and memory admin.

use axum::Json;
use axum::extract::{Path, Query, State};
use kioku_agent::TurnRequest;
use kioku_core::{ChatMessage, Role, now_ms};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ApiError;
use crate::server::AppContext;

/// One prior turn as clients send it: role and content only.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub history: Vec<WireTurn>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Upload ids referenced by the message; currently informational.
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionBody {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageBody {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MemoriesQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

pub async fn get_root() -> Json<Value> {
    Json(json!({ "message": "Kioku Backend API", "status": "running" }))
}

pub async fn get_health(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_ms(),
        "services": {
            "openai": ctx.llm.health_check().await,
            "vector": ctx.vector.health_check().await,
            "d1": ctx.sessions.is_enabled(),
        }
    }))
}

pub async fn post_chat(
    State(ctx): State<AppContext>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<Value>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    if !body.attachments.is_empty() {
        info!(count = body.attachments.len(), "chat message references attachments");
    }

    // History arrives as bare role/content pairs; give the turns
    // synthetic identity so they fit the shared message type.
    let history: Vec<ChatMessage> = body
        .history
        .into_iter()
        .map(|turn| ChatMessage {
            id: String::new(),
            session_id: body.session_id.clone().unwrap_or_default(),
            role: turn.role,
            content: turn.content,
            timestamp: now_ms(),
        })
        .collect();

    let outcome = ctx
        .orchestrator
        .run_turn(TurnRequest {
            message: body.message,
            history,
            session_id: body.session_id,
            user_id: body.user_id,
        })
        .await;

    Ok(Json(json!({
        "response": outcome.reply,
        "memories": outcome.memories,
        "session_id": outcome.session_id,
        "memory_stored": outcome.memory_stored,
    })))
}

pub async fn get_sessions(
    State(ctx): State<AppContext>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Value>, ApiError> {
    let sessions = ctx.sessions.list_sessions(query.limit).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn post_session(
    State(ctx): State<AppContext>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Value>, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let session = ctx.sessions.create_session(body.title.trim()).await?;
    Ok(Json(json!({ "session": session })))
}

pub async fn get_session(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match ctx.sessions.get_session(&id).await? {
        Some(session) => {
            let message_count = ctx.sessions.message_count(&id).await?;
            Ok(Json(json!({
                "session": session,
                "message_count": message_count,
            })))
        }
        None => Err(ApiError::not_found("session not found")),
    }
}

pub async fn put_session(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSessionBody>,
) -> Result<Json<Value>, ApiError> {
    let updated = ctx
        .sessions
        .update_session(&id, body.title.as_deref())
        .await?;
    if !updated {
        return Err(ApiError::not_found("session not found"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_session(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = ctx.sessions.delete_session(&id).await?;
    if !deleted {
        return Err(ApiError::not_found("session not found"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn get_messages(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Value>, ApiError> {
    if ctx.sessions.get_session(&id).await?.is_none() {
        return Err(ApiError::not_found("session not found"));
    }
    let messages = ctx.sessions.list_messages(&id, query.limit).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn post_message(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(body): Json<AddMessageBody>,
) -> Result<Json<Value>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    let (message, created_session) = ctx
        .sessions
        .add_message(Some(&id), body.role, &body.content)
        .await?;
    Ok(Json(json!({
        "message": message,
        "created_session": created_session,
    })))
}

pub async fn get_search(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let q = query.q.trim();
    if q.len() < 2 {
        return Err(ApiError::bad_request(
            "search query must be at least 2 characters",
        ));
    }
    let results = ctx.sessions.search_messages(q, query.limit).await?;
    let count = results.len();
    Ok(Json(json!({ "results": results, "count": count })))
}

pub async fn get_stats(State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let stats = ctx.sessions.stats().await?;
    Ok(Json(json!({ "stats": stats })))
}

pub async fn delete_memories(
    State(ctx): State<AppContext>,
    Query(query): Query<MemoriesQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = query
        .user_id
        .unwrap_or_else(|| ctx.config.memory.user_id.clone());
    let cleared = ctx.vector.clear(&user_id).await;
    info!(user_id = %user_id, cleared, "memory clear requested");
    Ok(Json(json!({ "success": cleared })))
}
