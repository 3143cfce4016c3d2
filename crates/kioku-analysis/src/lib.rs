// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-analysis helpers for the kioku backend: wall-clock context,
//! lexicon sentiment scoring, and keyword event classification.
//!
//! Every function here degrades to a safe default instead of erroring;
//! analysis must never be the reason a chat turn fails.

pub mod emotion;
pub mod event;
pub mod time;

pub use emotion::analyze_emotion;
pub use event::{GENERAL_CATEGORY, classify_event};
pub use time::{TimeContext, TimeProvider};
