// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI client for the kioku backend: chat completions, embeddings,
//! and audio transcription, plus context-window assembly.

pub mod client;
pub mod context;
pub mod types;

pub use client::{APOLOGY_REPLY, GeneratedReply, OpenAiClient};
pub use context::{SYSTEM_PROMPT, build_context};
