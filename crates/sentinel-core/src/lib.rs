pub mod config;
pub mod coordinator;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod reader;
pub mod rules;
pub mod scheduler;
pub mod startup;
pub mod stats;
pub mod submitter;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{Result, SentinelError};
