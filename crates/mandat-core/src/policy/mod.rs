//! Pure policy evaluation for delegated-authority requests.
//!
//! [`evaluate`] is deterministic, performs no I/O, and never mutates its
//! inputs, so callers may invoke it any number of times to simulate an
//! action before committing it. A rejection is a normal structured return
//! value, not an error: callers branch on [`Verdict`].
//!
//! Rules run in a fixed order and the first disqualifying rule determines
//! the rejection. Unset or unrestricted scope lists permit everything
//! (open-policy default).

use serde::{Deserialize, Serialize};

use crate::model::{ActionContext, Delegation, DelegationStatus};


/// Machine-readable rule codes attached to decision reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RuleCode {
    /// The amount was zero (or otherwise unusable).
    InvalidAmount,
    /// The delegation is suspended, revoked, or expired.
    DelegationNotActive,
    /// The action timestamp falls outside the validity window.
    OutOfValidityWindow,
    /// The action, bureau, or document type is outside the granted scope.
    OutOfScope,
    /// The amount exceeds the per-use ceiling.
    PerUseLimitExceeded,
    /// The amount would push the cumulative total over its ceiling.
    TotalLimitExceeded,
    /// The daily operation budget is already consumed.
    DailyOpsExceeded,
    /// The delegate attempted self-use under a delegation that forbids it.
    SelfUseForbidden,
    /// The delegate is the requester; dual control applies.
    SelfUseRequiresDualControl,
}

impl RuleCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::DelegationNotActive => "DELEGATION_NOT_ACTIVE",
            Self::OutOfValidityWindow => "OUT_OF_VALIDITY_WINDOW",
            Self::OutOfScope => "OUT_OF_SCOPE",
            Self::PerUseLimitExceeded => "PER_USE_LIMIT_EXCEEDED",
            Self::TotalLimitExceeded => "TOTAL_LIMIT_EXCEEDED",
            Self::DailyOpsExceeded => "DAILY_OPS_EXCEEDED",
            Self::SelfUseForbidden => "SELF_USE_FORBIDDEN",
            Self::SelfUseRequiresDualControl => "SELF_USE_REQUIRES_DUAL_CONTROL",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary controls that must be satisfied before a conditional
/// approval may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RequiredControl {
    /// A second approver must sign off.
    DualControl,
    /// Legal review before execution.
    LegalReview,
    /// Finance department verification.
    FinanceCheck,
}

/// Evaluation outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The action may proceed as requested.
    Approve,
    /// The action must not proceed.
    Reject,
    /// The action may proceed only once the required controls are met.
    Conditional,
}

/// A single reason backing a decision: machine-readable code plus human
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    /// Rule code for programmatic branching.
    pub code: RuleCode,
    /// Human-readable explanation for audit display.
    pub message: String,
}

impl Reason {
    fn new(code: RuleCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The evaluator's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Outcome kind.
    pub verdict: Verdict,
    /// Reasons backing the verdict. Empty only for a plain approval.
    pub reasons: Vec<Reason>,
    /// Controls required when the verdict is conditional.
    pub required_controls: Vec<RequiredControl>,
}

impl Decision {
    fn approve() -> Self {
        Self {
            verdict: Verdict::Approve,
            reasons: Vec::new(),
            required_controls: Vec::new(),
        }
    }

    fn reject(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Reject,
            reasons: vec![reason],
            required_controls: Vec::new(),
        }
    }

    fn conditional(reason: Reason, controls: Vec<RequiredControl>) -> Self {
        Self {
            verdict: Verdict::Conditional,
            reasons: vec![reason],
            required_controls: controls,
        }
    }

    /// Returns `true` for an unconditional approval.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.verdict == Verdict::Approve
    }

    /// Returns `true` for a rejection.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Reject
    }
}

/// Evaluates one candidate action against a delegation's policy.
///
/// Rule order: amount validity, status, validity window, scope
/// (action / bureau / document type), per-use amount, cumulative amount,
/// daily operation count, self-dealing. Amount boundaries are inclusive:
/// an amount exactly at a ceiling passes.
#[must_use]
pub fn evaluate(delegation: &Delegation, context: &ActionContext) -> Decision {
    if let Some(0) = context.amount {
        return Decision::reject(Reason::new(
            RuleCode::InvalidAmount,
            "amount must be strictly positive",
        ));
    }

    if delegation.status != DelegationStatus::Active {
        return Decision::reject(Reason::new(
            RuleCode::DelegationNotActive,
            format!("delegation is {}", delegation.status),
        ));
    }

    if !delegation.window_contains(context.timestamp) {
        return Decision::reject(Reason::new(
            RuleCode::OutOfValidityWindow,
            format!(
                "action at {} is outside validity window {}..{}",
                context.timestamp, delegation.starts_at, delegation.ends_at
            ),
        ));
    }

    if !delegation.allowed_actions.permits(&context.action) {
        return Decision::reject(Reason::new(
            RuleCode::OutOfScope,
            format!("action '{}' is not covered by the delegation", context.action),
        ));
    }
    if !delegation.bureaux.permits(&context.bureau) {
        return Decision::reject(Reason::new(
            RuleCode::OutOfScope,
            format!("bureau '{}' is not covered by the delegation", context.bureau),
        ));
    }
    if let Some(document_type) = &context.document_type {
        if !delegation.document_types.permits(document_type) {
            return Decision::reject(Reason::new(
                RuleCode::OutOfScope,
                format!("document type '{document_type}' is not covered by the delegation"),
            ));
        }
    }

    if let Some(amount) = context.amount {
        if let Some(max) = delegation.limits.max_per_use_amount {
            if amount > max {
                return Decision::reject(Reason::new(
                    RuleCode::PerUseLimitExceeded,
                    format!("amount {amount} exceeds per-use limit {max}"),
                ));
            }
        }
        if let Some(max) = delegation.limits.max_total_amount {
            if delegation.usage_total_amount.saturating_add(amount) > max {
                return Decision::reject(Reason::new(
                    RuleCode::TotalLimitExceeded,
                    format!(
                        "amount {amount} would push cumulative total {} over limit {max}",
                        delegation.usage_total_amount
                    ),
                ));
            }
        }
    }

    if let Some(max_ops) = delegation.limits.max_daily_ops {
        if delegation.usage_count >= max_ops {
            return Decision::reject(Reason::new(
                RuleCode::DailyOpsExceeded,
                format!("daily operation budget of {max_ops} already consumed"),
            ));
        }
    }

    if context.requester.id == delegation.delegate.id {
        if delegation.forbid_self_use {
            return Decision::reject(Reason::new(
                RuleCode::SelfUseForbidden,
                "delegate may not act as requester under this delegation",
            ));
        }
        return Decision::conditional(
            Reason::new(
                RuleCode::SelfUseRequiresDualControl,
                "delegate is the requester; a second approver is required",
            ),
            vec![RequiredControl::DualControl],
        );
    }

    Decision::approve()
}
