// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat history persistence over the Cloudflare D1 HTTP API.
//!
//! [`D1Client`] speaks the query endpoint with retry and row
//! normalization; [`SessionStore`] implements the session and message
//! schema on top of it. Missing credentials disable the store: every
//! operation returns [`kioku_core::KiokuError::Unavailable`] and the
//! gateway maps that to 503.

pub mod client;
pub mod store;

pub use client::{D1Client, Row, Statement};
pub use store::{FALLBACK_SESSION_TITLE, SessionStore, StoreStats};
