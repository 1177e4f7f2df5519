//! Ledger access for the liquidation agent.
//!
//! This crate owns everything that talks to the chain: a JSON-RPC view
//! client, typed views of contract state, the abstract source traits the
//! core consumes (accounts, assets, prices, pools, transaction submission),
//! and concrete clients for the lending contract, both oracles, and the
//! exchange contract.
//!
//! Retry and backoff policy is intentionally out of scope: a failed call
//! surfaces as an error and the caller decides whether the current pass
//! survives it.

mod burrow;
mod oracle;
mod ref_finance;
mod rpc;
pub mod sources;
mod tx;
pub mod views;

pub use burrow::BurrowClient;
pub use oracle::OracleClient;
pub use ref_finance::RefExchangeClient;
pub use rpc::{RpcClient, RpcError};
pub use sources::{AccountSource, AssetSource, PoolSource, PriceSource, TxOutcome, TxSubmitter};
pub use tx::DryRunSubmitter;

/// Gas attached to liquidation calls: 300 Tgas.
pub const LIQUIDATION_GAS: u64 = 300_000_000_000_000;

/// Deposit attached to change calls: one yoctoNEAR.
pub const ONE_YOCTO: u128 = 1;
