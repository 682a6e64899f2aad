//! Built-in block actions for the Scribe indexer.
//!
//! Each action is self-contained: it carries its own domain models, its
//! own storage trait with a PostgreSQL implementation, and the idempotent
//! schema its `prepare_schema` applies. Adding a new kind of on-chain
//! activity to index means adding a module shaped like the ones here and
//! registering it in the binary's [`builtin_registry`].
//!
//! # Actions
//!
//! - [`ibc_transfers`] - txs plus ICS-20 transfer and IBC packet
//!   lifecycle messages (`ics20_transfers`)
//! - [`cosmwasm`] - CosmWasm contract executions and instantiations
//!   (`cosmwasm_contracts`)

pub mod cosmwasm;
pub mod ibc_transfers;

use std::sync::Arc;

use sqlx::PgPool;

use scribe_core::error::IndexerResult;
use scribe_core::ports::ActionRegistry;

pub use cosmwasm::CosmwasmAction;
pub use ibc_transfers::IbcTransferAction;

/// Build a registry containing every built-in action, backed by the
/// given pool.
///
/// Which actions actually run, and in what order, is decided by the
/// names resolved against this registry at startup.
pub fn builtin_registry(pool: PgPool) -> IndexerResult<ActionRegistry> {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(IbcTransferAction::with_pool(pool.clone())))?;
    registry.register(Arc::new(CosmwasmAction::with_pool(pool)))?;
    Ok(registry)
}
