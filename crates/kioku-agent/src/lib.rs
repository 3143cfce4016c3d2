// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for the kioku backend.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, TurnOutcome, TurnRequest, TurnStatuses};
