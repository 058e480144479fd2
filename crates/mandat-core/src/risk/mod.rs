//! Advisory risk detection for delegated-authority requests.
//!
//! [`detect`] runs against the same inputs as the policy evaluator but is
//! fully independent of it: risks inform the caller and never block an
//! action by themselves. Both functions are pure, so a `simulate` call can
//! run them together without side effects.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ActionContext, Delegation};

/// Days of remaining validity at or below which a continuity risk is
/// raised.
const CONTINUITY_WARNING_DAYS: i64 = 7;
/// Days of remaining validity at or below which the continuity risk is
/// high.
const CONTINUITY_HIGH_DAYS: i64 = 2;

/// Category of an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RiskType {
    /// The delegation is close to expiry; authority continuity is at
    /// stake.
    Continuity,
    /// The action would exceed the remaining cumulative budget.
    BudgetOverrun,
    /// The delegate is requesting an action for themselves.
    ConflictOfInterest,
}

impl RiskType {
    /// Returns the wire representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Continuity => "CONTINUITY",
            Self::BudgetOverrun => "BUDGET_OVERRUN",
            Self::ConflictOfInterest => "CONFLICT_OF_INTEREST",
        }
    }
}

/// Severity of an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// An advisory finding: informs the caller, never blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    /// Category of the finding.
    pub risk_type: RiskType,
    /// Severity.
    pub level: RiskLevel,
    /// What was detected.
    pub description: String,
    /// Suggested mitigation.
    pub mitigation: String,
    /// When the finding was made (the context timestamp).
    pub detected_at: DateTime<Utc>,
}

/// Number of whole days remaining before `ends_at`, rounded up.
fn remaining_days(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = ends_at - now;
    let days = remaining.num_days();
    if remaining > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

/// Detects advisory risks for one candidate action.
///
/// Additive: additional risk types can appear here without touching the
/// policy evaluator.
#[must_use]
pub fn detect(delegation: &Delegation, context: &ActionContext) -> Vec<Risk> {
    let mut risks = Vec::new();
    let now = context.timestamp;

    let days_left = remaining_days(delegation.ends_at, now);
    if days_left <= CONTINUITY_WARNING_DAYS {
        let level = if days_left <= CONTINUITY_HIGH_DAYS {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
        let description = if days_left <= 0 {
            format!("delegation '{}' has expired", delegation.id)
        } else {
            format!(
                "delegation '{}' expires in {days_left} day(s)",
                delegation.id
            )
        };
        risks.push(Risk {
            risk_type: RiskType::Continuity,
            level,
            description,
            mitigation: "extend the delegation or arrange a successor grant".to_owned(),
            detected_at: now,
        });
    }

    if let (Some(amount), Some(remaining)) = (context.amount, delegation.remaining_total()) {
        if amount > remaining {
            risks.push(Risk {
                risk_type: RiskType::BudgetOverrun,
                level: RiskLevel::Critical,
                description: format!(
                    "amount {amount} exceeds remaining cumulative budget {remaining}"
                ),
                mitigation: "split the operation or raise the total ceiling with the principal"
                    .to_owned(),
                detected_at: now,
            });
        }
    }

    if context.requester.id == delegation.delegate.id {
        risks.push(Risk {
            risk_type: RiskType::ConflictOfInterest,
            level: RiskLevel::High,
            description: format!(
                "requester '{}' is the delegate of delegation '{}'",
                context.requester.id, delegation.id
            ),
            mitigation: "route through dual control with an independent approver".to_owned(),
            detected_at: now,
        });
    }

    risks
}
