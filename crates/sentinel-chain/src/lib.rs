//! EVM binding for `sentinel-core`: implements `LedgerReader` and
//! `LedgerWriter` against a deployed treasury vault over JSON-RPC.

pub mod contract;
pub mod error;
pub mod ledger;

pub use error::ChainError;
pub use ledger::ChainLedger;
