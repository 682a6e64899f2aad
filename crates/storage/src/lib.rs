//! PostgreSQL connection layer for the Scribe indexer.
//!
//! This crate owns the connection pool every action's storage
//! implementation writes through. Schema ownership lives with the
//! actions themselves (each action prepares its own tables); this layer
//! only manages connectivity.

mod postgres;

pub use postgres::{Database, DatabaseConfig};
