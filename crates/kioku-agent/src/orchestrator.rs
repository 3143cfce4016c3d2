// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn chat pipeline.
//!
//! A turn always produces a reply: every dependency failure degrades
//! (zero-vector embedding, empty memory list, apology reply) instead of
//! erroring. Persistence runs after the response is returned and its
//! failures are logged only.

use kioku_analysis::{TimeProvider, analyze_emotion, classify_event};
use kioku_config::model::MemoryConfig;
use kioku_core::{ChatMessage, MemoryHit, MemoryRecord, Role, StepStatus, now_ms};
use kioku_d1::SessionStore;
use kioku_llm::OpenAiClient;
use kioku_vector::VectorMemoryStore;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Interaction type stamped on stored user turns.
const USER_INTERACTION: &str = "user_message";

/// Interaction type stamped on stored assistant turns.
const ASSISTANT_INTERACTION: &str = "assistant_message";

/// Category stamped on stored assistant turns.
const RESPONSE_CATEGORY: &str = "response";

/// One incoming chat turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Outcome tags for each fallible pipeline step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TurnStatuses {
    pub embedding: StepStatus,
    pub retrieval: StepStatus,
    pub generation: StepStatus,
}

/// The synchronous result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub memories: Vec<MemoryHit>,
    pub session_id: Option<String>,
    /// Whether background persistence to the vector store was scheduled.
    pub memory_stored: bool,
    pub statuses: TurnStatuses,
}

/// Coordinates the analysis, retrieval, generation, and persistence
/// services for chat turns. Stateless across turns; cheap to clone.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    llm: OpenAiClient,
    vector: VectorMemoryStore,
    sessions: SessionStore,
    time: TimeProvider,
    default_user_id: String,
    top_k: usize,
}

impl Orchestrator {
    pub fn new(
        llm: OpenAiClient,
        vector: VectorMemoryStore,
        sessions: SessionStore,
        time: TimeProvider,
        memory: &MemoryConfig,
    ) -> Self {
        Self {
            llm,
            vector,
            sessions,
            time,
            default_user_id: memory.user_id.clone(),
            top_k: memory.top_k,
        }
    }

    /// Runs one chat turn: embed, analyze, retrieve, generate, respond.
    /// Persistence of both turns happens in a spawned task after return.
    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        let user_id = request
            .user_id
            .clone()
            .unwrap_or_else(|| self.default_user_id.clone());

        let (embedding, embedding_status) = self.llm.embedding_or_zero(&request.message).await;

        let emotion = analyze_emotion(&request.message);
        let (category, confidence) = classify_event(&request.message);
        debug!(
            category = %category,
            confidence,
            emotion_weight = emotion.emotion_weight,
            "turn analyzed"
        );

        let (memories, retrieval_status) =
            self.vector.search(&embedding, &user_id, self.top_k).await;

        let time = self.time.now_context();
        let generated = self
            .llm
            .generate_response(&request.message, &memories, &request.history, &time, &self.time)
            .await;

        let statuses = TurnStatuses {
            embedding: embedding_status,
            retrieval: retrieval_status,
            generation: generated.status,
        };
        info!(
            embedding = %statuses.embedding,
            retrieval = %statuses.retrieval,
            generation = %statuses.generation,
            memories = memories.len(),
            category = %category,
            "chat turn completed"
        );

        let memory_stored = self.vector.is_configured();
        self.spawn_persistence(
            &request,
            &user_id,
            embedding,
            emotion.emotion_weight,
            category.clone(),
            &generated.text,
        );

        TurnOutcome {
            reply: generated.text,
            memories,
            session_id: request.session_id,
            memory_stored,
            statuses,
        }
    }

    /// Fire-and-forget persistence of both turns. The response has
    /// already been sent by the time this work runs.
    fn spawn_persistence(
        &self,
        request: &TurnRequest,
        user_id: &str,
        user_embedding: Vec<f32>,
        user_emotion_weight: f32,
        category: String,
        reply: &str,
    ) {
        let orchestrator = self.clone();
        let message = request.message.clone();
        let session_id = request.session_id.clone();
        let user_id = user_id.to_string();
        let reply = reply.to_string();

        tokio::spawn(async move {
            orchestrator
                .persist_turn(
                    &message,
                    &reply,
                    &user_id,
                    session_id.as_deref(),
                    user_embedding,
                    user_emotion_weight,
                    &category,
                )
                .await;
        });
    }

    async fn persist_turn(
        &self,
        message: &str,
        reply: &str,
        user_id: &str,
        session_id: Option<&str>,
        user_embedding: Vec<f32>,
        user_emotion_weight: f32,
        category: &str,
    ) {
        let user_record = MemoryRecord {
            text: format!("User: {message}"),
            embedding: user_embedding,
            timestamp: now_ms(),
            user_id: user_id.to_string(),
            emotion_weight: user_emotion_weight,
            category: category.to_string(),
            interaction_type: USER_INTERACTION.to_string(),
        };
        self.vector.store(&user_record).await;

        let (reply_embedding, status) = self.llm.embedding_or_zero(reply).await;
        if status == StepStatus::Degraded {
            debug!("reply embedding degraded, storing zero vector");
        }
        let assistant_record = MemoryRecord {
            text: format!("Assistant: {reply}"),
            embedding: reply_embedding,
            timestamp: now_ms(),
            user_id: user_id.to_string(),
            emotion_weight: analyze_emotion(reply).emotion_weight,
            category: RESPONSE_CATEGORY.to_string(),
            interaction_type: ASSISTANT_INTERACTION.to_string(),
        };
        self.vector.store(&assistant_record).await;

        if let Some(id) = session_id {
            if self.sessions.is_enabled() {
                if let Err(e) = self.sessions.add_message(Some(id), Role::User, message).await {
                    warn!(error = %e, session_id = %id, "failed to persist user turn");
                }
                if let Err(e) = self
                    .sessions
                    .add_message(Some(id), Role::Assistant, reply)
                    .await
                {
                    warn!(error = %e, session_id = %id, "failed to persist assistant turn");
                }
            }
        }
    }
}
