//! Recency Lists Server Library
//!
//! Per-user bounded recency lists (watchlist, favourites, viewed, recent bids,
//! purchases) over SQLite, served over HTTP.

pub mod config;
pub mod identity;
pub mod lists;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use identity::{HttpIdentityResolver, IdentityResolver};
pub use lists::{ListManager, ListName, SqliteListStore};
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
