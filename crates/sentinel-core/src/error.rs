use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single problem found while validating process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Which step of an execution attempt failed before settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStage {
    Simulate,
    Submit,
    Confirm,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Simulate => "simulate",
            Self::Submit => "submit",
            Self::Confirm => "confirm",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("invalid configuration: {}", join_issues(.0))]
    InvalidConfig(Vec<ConfigIssue>),

    #[error("read failed ({what}): {message}")]
    Read { what: String, message: String },

    #[error("submission failed for policy {policy_id} during {stage}: {message}")]
    Submission {
        policy_id: u64,
        stage: SubmitStage,
        message: String,
    },

    #[error("policy {policy_id} execution reverted by the ledger (tx {tx_hash})")]
    LedgerRejection { policy_id: u64, tx_hash: String },

    /// A state-changing ledger call (dry-run or broadcast) was refused.
    #[error("{call}: {message}")]
    Ledger { call: String, message: String },
}

impl SentinelError {
    pub fn read(what: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Read {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn submission(policy_id: u64, stage: SubmitStage, message: impl fmt::Display) -> Self {
        Self::Submission {
            policy_id,
            stage,
            message: message.to_string(),
        }
    }

    pub fn ledger(call: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Ledger {
            call: call.into(),
            message: message.to_string(),
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SentinelError>;
