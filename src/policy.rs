//! Policy engine: the Rule of Two.
//!
//! Any two trifecta conditions may be active in a session at once; the call
//! that would activate the third is blocked. Pure function over a condition
//! snapshot, so decisions are exactly reproducible for identical inputs.

use crate::registry::{Condition, ConditionSet};
use serde::Serialize;

/// Evaluation verdict. BLOCK is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Block,
}

/// Outcome of one policy evaluation against a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub verdict: Verdict,
    /// Condition set the session should hold after this call. Equal to the
    /// input set on BLOCK, since blocked calls leave no trace on state.
    pub resulting: ConditionSet,
    pub reason: String,
}

/// Evaluate one incoming condition against the session's active set.
pub fn evaluate(current: ConditionSet, incoming: Condition) -> PolicyOutcome {
    if current.contains(incoming) {
        return PolicyOutcome {
            verdict: Verdict::Allow,
            resulting: current,
            reason: format!("condition '{incoming}' already recorded for this session"),
        };
    }

    let candidate = current.with(incoming);
    if candidate.is_complete() {
        return PolicyOutcome {
            verdict: Verdict::Block,
            resulting: current,
            reason: format!(
                "condition '{incoming}' would complete all three trifecta conditions; \
                 blocked by the Rule of Two"
            ),
        };
    }

    PolicyOutcome {
        verdict: Verdict::Allow,
        resulting: candidate,
        reason: format!("condition '{incoming}' recorded; trifecta not complete"),
    }
}
