// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory over a remote Milvus/Zilliz collection.
//!
//! [`MilvusClient`] speaks the REST v2 entity API; [`VectorMemoryStore`]
//! layers the degrade policy on top: failed writes report `false`, failed
//! reads return empty, and missing credentials disable the store without
//! erroring.

pub mod client;
pub mod store;

pub use client::MilvusClient;
pub use store::VectorMemoryStore;
