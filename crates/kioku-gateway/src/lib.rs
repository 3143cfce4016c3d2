// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the kioku backend.
//!
//! An axum router with permissive CORS and bearer-token auth on all
//! `/api/` routes. Handlers are thin: they validate input, call into the
//! injected services, and map errors to JSON `{error}` bodies.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod upload;

pub use server::{AppContext, build_router, start_server};
