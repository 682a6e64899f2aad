//! Core domain layer for the Scribe indexer.
//!
//! This crate contains the domain models, port traits (interfaces), the
//! retry policy, and the indexing engine for a CometBFT range indexer. It
//! follows hexagonal architecture principles - this is the innermost layer
//! with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      scribe (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │        scribe-actions        │        scribe-cometbft       │
//! │     (block actions)          │          (chain RPC)         │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                       scribe-storage                        │
//! │                        (PostgreSQL)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       scribe-core  ← YOU ARE HERE           │
//! │              (models, ports, retry, engine)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (hashes, coins, decoded txs, messages)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - The indexing engine
//! - [`retry`] - Bounded retry with exponential backoff
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::ChainClient`] - Fetch blocks and tx data from a chain node
//! - [`ports::BlockAction`] - Derive and persist records from blocks
//!
//! ## Block Actions
//!
//! The indexer uses an action-based extensibility model. Each kind of
//! on-chain activity worth indexing implements [`ports::BlockAction`].
//! Actions are registered in a [`ports::ActionRegistry`], activated by
//! name from configuration, and run against every fetched block.
//!
//! ## Engine Lifecycle
//!
//! 1. Validate configuration and prepare every action's schema
//! 2. Fan out bounded-parallel fetches over the requested heights
//! 3. Retry each fetch within its bounded backoff budget
//! 4. Dispatch every fetched block to all actions in order
//! 5. Re-run the fan-out over the heights that exhausted their budget,
//!    pass by pass, until none remain

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod retry;
pub mod services;
