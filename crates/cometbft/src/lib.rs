//! CometBFT adapter for the Scribe indexer.
//!
//! Implements the core [`scribe_core::ports::ChainClient`] port over the
//! CometBFT (Tendermint) JSON-RPC/HTTP interface, including the minimal
//! protobuf decoding needed to surface the message kinds the built-in
//! actions index.

mod client;
mod decode;
mod proto;

pub use client::{CometClient, CometClientConfig};
pub use decode::decode_tx;
