//! Block action indexing CosmWasm smart contract activity.

mod action;
mod models;
mod storage;

pub use action::{ACTION_NAME, CosmwasmAction};
pub use models::{ContractExecution, ContractInstantiation};
pub use storage::{PgWasmStorage, WasmStorage};
