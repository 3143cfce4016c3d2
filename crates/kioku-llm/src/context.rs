// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the textual context window sent to the chat model.
//!
//! One system-style string: persona, current time, up to three retrieved
//! memory snippets, the last five history turns, and the current message.
//! The whole thing is capped before sending so it respects the remote
//! model's input limit.

use kioku_analysis::{TimeContext, TimeProvider};
use kioku_core::{ChatMessage, MemoryHit, Role};

/// Persona and behavior instructions for the assistant.
pub const SYSTEM_PROMPT: &str = "You are Kioku, an AI assistant with memory capabilities. \
You are helpful, knowledgeable, and can remember past conversations.\n\
Guidelines:\n\
- Be conversational and friendly\n\
- Use the provided context and memories to give relevant responses\n\
- If you remember something from a past conversation, mention it naturally\n\
- Be concise but thorough\n\
- Always aim to be helpful and accurate";

/// At most this many memory snippets go into the context.
const MAX_MEMORIES: usize = 3;

/// At most this many history turns go into the context.
const MAX_HISTORY: usize = 5;

/// Per-snippet content cap, characters.
const MEMORY_SNIPPET_CHARS: usize = 200;

/// Total context cap, characters.
const MAX_CONTEXT_CHARS: usize = 6000;

/// Build the context string for one chat turn.
pub fn build_context(
    message: &str,
    memories: &[MemoryHit],
    history: &[ChatMessage],
    time: &TimeContext,
    time_provider: &TimeProvider,
) -> String {
    let mut parts: Vec<String> = vec![
        format!("Current time: {} ({})", time.current_time, time.weekday),
        String::new(),
    ];

    if !memories.is_empty() {
        parts.push("Relevant past memories:".to_string());
        for (i, memory) in memories.iter().take(MAX_MEMORIES).enumerate() {
            let stamp = time_provider.format_timestamp(memory.timestamp);
            parts.push(format!(
                "{}. [{}] {} (relevance {:.2})",
                i + 1,
                stamp,
                truncate(&memory.text, MEMORY_SNIPPET_CHARS),
                memory.score,
            ));
        }
        parts.push(String::new());
    }

    if !history.is_empty() {
        parts.push("Recent conversation:".to_string());
        let skip = history.len().saturating_sub(MAX_HISTORY);
        for msg in &history[skip..] {
            let speaker = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            parts.push(format!("{speaker}: {}", msg.content));
        }
        parts.push(String::new());
    }

    parts.push(format!("Current user message: {message}"));

    truncate(&parts.join("\n"), MAX_CONTEXT_CHARS)
}

/// Truncate on a character boundary, appending an ellipsis when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
