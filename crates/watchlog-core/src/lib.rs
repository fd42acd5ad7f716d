//! Core types and trait definitions for the watchlog tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod anime;
pub mod error;
pub mod event;
pub mod listing;
pub mod query;
pub mod series;
pub mod store;
pub mod text;
pub mod version;

pub use error::{Error, Result};
