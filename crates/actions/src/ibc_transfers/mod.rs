//! Block action indexing txs and IBC fungible token transfer activity.

mod action;
mod models;
mod storage;

pub use action::{ACTION_NAME, IbcTransferAction};
pub use models::{PacketMsgRecord, TransferMsgRecord, TxRecord};
pub use storage::{IbcTransferStorage, PgIbcTransferStorage};
