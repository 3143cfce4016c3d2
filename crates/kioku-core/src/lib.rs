// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the kioku chat-memory backend.
//!
//! Provides the shared error type and the domain types exchanged between
//! the stores, the LLM client, the orchestrator, and the HTTP gateway.

pub mod error;
pub mod types;

pub use error::KiokuError;
pub use types::{
    ChatMessage, ChatSession, EmotionAnalysis, MemoryHit, MemoryRecord, MessageMatch, Role,
    StepStatus, now_ms,
};
