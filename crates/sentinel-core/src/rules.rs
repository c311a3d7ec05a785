use crate::eligibility::{EvalContext, Rule, SkipReason};

// ---------------------------------------------------------------------------
// Condition helpers
// ---------------------------------------------------------------------------

fn is_disabled(ctx: &EvalContext) -> bool {
    !ctx.observed.policy.enabled
}

fn is_not_due(ctx: &EvalContext) -> bool {
    ctx.now < ctx.observed.policy.next_execution_time
}

fn exceeds_cap(ctx: &EvalContext) -> bool {
    ctx.total() > ctx.observed.policy.max_per_execution
}

fn insufficient_funds(ctx: &EvalContext) -> bool {
    ctx.total() > ctx.vault.balance
}

fn awaiting_approval(ctx: &EvalContext) -> bool {
    let p = &ctx.observed.policy;
    p.requires_approval && !p.approved
}

fn vault_paused(ctx: &EvalContext) -> bool {
    ctx.vault.paused
}

// ---------------------------------------------------------------------------
// Default rules (priority-ordered)
// ---------------------------------------------------------------------------

/// Funding checks come before governance checks so operators can tell a
/// funding problem apart from an approval or pause gate in the logs.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "disabled",
            condition: is_disabled,
            reason: SkipReason::Disabled,
        },
        Rule {
            id: "not_due",
            condition: is_not_due,
            reason: SkipReason::NotDue,
        },
        Rule {
            id: "exceeds_cap",
            condition: exceeds_cap,
            reason: SkipReason::ExceedsCap,
        },
        Rule {
            id: "insufficient_funds",
            condition: insufficient_funds,
            reason: SkipReason::InsufficientFunds,
        },
        Rule {
            id: "awaiting_approval",
            condition: awaiting_approval,
            reason: SkipReason::AwaitingApproval,
        },
        Rule {
            id: "vault_paused",
            condition: vault_paused,
            reason: SkipReason::VaultPaused,
        },
    ]
}
