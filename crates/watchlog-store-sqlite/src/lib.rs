//! SQLite backend for the watchlog tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread pool without blocking the async runtime.

mod encode;
mod query;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use query::{ListQuery, build_anime_list_query};
pub use store::SqliteStore;
