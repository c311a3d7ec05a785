use std::fmt;
use std::sync::OnceLock;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::rules::default_rules;
use crate::types::{ObservedPolicy, VaultSnapshot};

// ---------------------------------------------------------------------------
// EvalContext
// ---------------------------------------------------------------------------

pub struct EvalContext<'a> {
    pub observed: &'a ObservedPolicy,
    /// Unix seconds.
    pub now: u64,
    pub vault: &'a VaultSnapshot,
}

impl EvalContext<'_> {
    pub fn total(&self) -> U256 {
        self.observed.total
    }
}

// ---------------------------------------------------------------------------
// SkipReason / Verdict (output)
// ---------------------------------------------------------------------------

/// Why a policy was not executed this cycle.
///
/// Serialized with the same spelling as [`SkipReason::as_str`], so reports
/// and log lines agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "disabled")]
    Disabled,
    #[serde(rename = "not due")]
    NotDue,
    /// The ledger reports a total above the policy's own cap. This means the
    /// ledger is inconsistent and is logged at ERROR.
    #[serde(rename = "exceeds cap")]
    ExceedsCap,
    #[serde(rename = "insufficient funds")]
    InsufficientFunds,
    #[serde(rename = "awaiting approval")]
    AwaitingApproval,
    #[serde(rename = "vault paused")]
    VaultPaused,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NotDue => "not due",
            Self::ExceedsCap => "exceeds cap",
            Self::InsufficientFunds => "insufficient funds",
            Self::AwaitingApproval => "awaiting approval",
            Self::VaultPaused => "vault paused",
        }
    }

    /// Log level at which a skip for this reason is reported.
    pub fn severity(self) -> tracing::Level {
        match self {
            Self::Disabled | Self::NotDue => tracing::Level::DEBUG,
            Self::AwaitingApproval => tracing::Level::INFO,
            Self::InsufficientFunds | Self::VaultPaused => tracing::Level::WARN,
            Self::ExceedsCap => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Skip(SkipReason),
    Execute,
}

impl Verdict {
    pub fn is_execute(self) -> bool {
        matches!(self, Self::Execute)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule: when `condition` holds, the policy is skipped for `reason`.
pub struct Rule {
    pub id: &'static str,
    pub condition: fn(&EvalContext) -> bool,
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Walks a priority-ordered rule list; the first matching rule wins.
pub struct Evaluator {
    rules: Vec<Rule>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Evaluator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> Verdict {
        self.rules
            .iter()
            .find(|rule| (rule.condition)(ctx))
            .map(|rule| Verdict::Skip(rule.reason))
            .unwrap_or(Verdict::Execute)
    }
}

/// The process-wide evaluator over [`default_rules`], built on first use.
pub fn default_evaluator() -> &'static Evaluator {
    static EVALUATOR: OnceLock<Evaluator> = OnceLock::new();
    EVALUATOR.get_or_init(Evaluator::default)
}

/// Evaluate one observed policy against the cycle's vault snapshot.
///
/// Pure and deterministic: no I/O, no clock reads.
pub fn evaluate(observed: &ObservedPolicy, now: u64, vault: &VaultSnapshot) -> Verdict {
    let ctx = EvalContext {
        observed,
        now,
        vault,
    };
    default_evaluator().evaluate(&ctx)
}
