//! Management actions on a delegation: extend, suspend, reactivate,
//! revoke, use.

use chrono::{DateTime, Duration, Utc};

use super::error::LifecycleError;
use crate::ledger::{seal, AuditEvent, EventDetails};
use crate::model::{Actor, Delegation, DelegationStatus};

/// Request to extend the validity window. Exactly one of `new_end_date`
/// or `days` must be supplied; when both are present the explicit date
/// wins.
#[derive(Debug, Clone, Default)]
pub struct ExtendRequest {
    /// Explicit new end of the validity window.
    pub new_end_date: Option<DateTime<Utc>>,
    /// Number of days to add to the current end.
    pub days: Option<i64>,
}

/// Request to suspend or revoke a delegation.
#[derive(Debug, Clone)]
pub struct SuspendRequest {
    /// Reason for the suspension/revocation. Must be non-empty.
    pub reason: String,
}

/// Request to record one exercise of delegated authority.
#[derive(Debug, Clone, Default)]
pub struct UseRequest {
    /// Reference of the target document, if any.
    pub target_doc: Option<String>,
    /// Type of the target document, if any.
    pub target_doc_type: Option<String>,
    /// Amount committed by this use, minor units.
    pub amount: Option<u64>,
}

fn ensure_not_revoked(
    delegation: &Delegation,
    action: &str,
) -> Result<(), LifecycleError> {
    if delegation.status == DelegationStatus::Revoked {
        return Err(LifecycleError::InvalidTransition {
            aggregate_id: delegation.id.clone(),
            from: delegation.status.as_str().to_owned(),
            action: action.to_owned(),
        });
    }
    Ok(())
}

/// Extends the validity window, reactivating an expired delegation.
///
/// Requires `new_end_date` or `days`. Revoked delegations accept no
/// further actions.
pub fn extend(
    delegation: &mut Delegation,
    request: &ExtendRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    ensure_not_revoked(delegation, "extend")?;

    let new_end = match (request.new_end_date, request.days) {
        (Some(date), _) => date,
        (None, Some(days)) => delegation.ends_at + Duration::days(days),
        (None, None) => {
            return Err(LifecycleError::MissingField {
                name: "new_end_date|days".to_owned(),
            });
        }
    };

    let reactivated = delegation.status == DelegationStatus::Expired;
    let details = EventDetails::Extended {
        previous_end: delegation.ends_at,
        new_end,
        reactivated,
    };
    let event = seal(
        &delegation.id,
        &delegation.head_hash,
        actor,
        format!("validity extended to {new_end}"),
        details,
        now,
    )?;

    delegation.ends_at = new_end;
    if reactivated {
        delegation.status = DelegationStatus::Active;
    }
    delegation.head_hash = event.hash.clone();
    Ok(event)
}

/// Suspends an active delegation.
pub fn suspend(
    delegation: &mut Delegation,
    request: &SuspendRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    if request.reason.trim().is_empty() {
        return Err(LifecycleError::MissingField {
            name: "reason".to_owned(),
        });
    }
    if delegation.status != DelegationStatus::Active {
        return Err(LifecycleError::InvalidTransition {
            aggregate_id: delegation.id.clone(),
            from: delegation.status.as_str().to_owned(),
            action: "suspend".to_owned(),
        });
    }

    let event = seal(
        &delegation.id,
        &delegation.head_hash,
        actor,
        format!("suspended: {}", request.reason),
        EventDetails::Suspended {
            reason: request.reason.clone(),
        },
        now,
    )?;

    delegation.status = DelegationStatus::Suspended;
    delegation.suspended_at = Some(now);
    delegation.suspended_by = Some(actor.id.clone());
    delegation.suspension_reason = Some(request.reason.clone());
    delegation.head_hash = event.hash.clone();
    Ok(event)
}

/// Lifts a suspension. Only valid from the suspended state.
pub fn reactivate(
    delegation: &mut Delegation,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    if delegation.status != DelegationStatus::Suspended {
        return Err(LifecycleError::InvalidTransition {
            aggregate_id: delegation.id.clone(),
            from: delegation.status.as_str().to_owned(),
            action: "reactivate".to_owned(),
        });
    }

    let event = seal(
        &delegation.id,
        &delegation.head_hash,
        actor,
        "suspension lifted",
        EventDetails::Reactivated,
        now,
    )?;

    delegation.status = DelegationStatus::Active;
    delegation.suspended_at = None;
    delegation.suspended_by = None;
    delegation.suspension_reason = None;
    delegation.head_hash = event.hash.clone();
    Ok(event)
}

/// Permanently withdraws the delegation. Terminal.
pub fn revoke(
    delegation: &mut Delegation,
    request: &SuspendRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    if request.reason.trim().is_empty() {
        return Err(LifecycleError::MissingField {
            name: "reason".to_owned(),
        });
    }
    ensure_not_revoked(delegation, "revoke")?;

    let event = seal(
        &delegation.id,
        &delegation.head_hash,
        actor,
        format!("revoked: {}", request.reason),
        EventDetails::Revoked {
            reason: request.reason.clone(),
        },
        now,
    )?;

    delegation.status = DelegationStatus::Revoked;
    delegation.head_hash = event.hash.clone();
    Ok(event)
}

/// Records one exercise of delegated authority.
///
/// Re-validates status, validity window, and the running counters
/// (daily budget, cumulative ceiling) against the loaded aggregate, so
/// two concurrent uses can never both take a last remaining slot. Scope
/// checks (action, bureau, document type) are the caller's
/// responsibility via [`crate::policy::evaluate`] before committing.
pub fn use_delegation(
    delegation: &mut Delegation,
    request: &UseRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    if delegation.status != DelegationStatus::Active {
        return Err(LifecycleError::DelegationNotActive {
            delegation_id: delegation.id.clone(),
            status: delegation.status,
        });
    }
    if !delegation.window_contains(now) {
        return Err(LifecycleError::OutsideValidityWindow {
            delegation_id: delegation.id.clone(),
        });
    }
    if let Some(max_daily_ops) = delegation.limits.max_daily_ops {
        if delegation.usage_count >= max_daily_ops {
            return Err(LifecycleError::DailyOpsExhausted {
                delegation_id: delegation.id.clone(),
                max_daily_ops,
            });
        }
    }
    if let (Some(amount), Some(max_total_amount)) =
        (request.amount, delegation.limits.max_total_amount)
    {
        if delegation.usage_total_amount.saturating_add(amount) > max_total_amount {
            return Err(LifecycleError::TotalAmountExhausted {
                delegation_id: delegation.id.clone(),
                max_total_amount,
            });
        }
    }

    let summary = match &request.target_doc {
        Some(doc) => format!("authority used for {doc}"),
        None => "authority used".to_owned(),
    };
    let event = seal(
        &delegation.id,
        &delegation.head_hash,
        actor,
        summary,
        EventDetails::Used {
            target_doc: request.target_doc.clone(),
            target_doc_type: request.target_doc_type.clone(),
            amount: request.amount,
        },
        now,
    )?;

    // Counters are monotonic: saturate rather than wrap.
    delegation.usage_count = delegation.usage_count.saturating_add(1);
    if let Some(amount) = request.amount {
        delegation.usage_total_amount = delegation.usage_total_amount.saturating_add(amount);
    }
    delegation.last_used_at = Some(now);
    delegation.last_used_for = request.target_doc.clone();
    delegation.head_hash = event.hash.clone();
    Ok(event)
}
