//! Escalation and resolution of blocked dossiers.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::error::LifecycleError;
use crate::crypto::{derive_hash, SUBSTITUTION_ROOT};
use crate::ledger::{seal, AuditEvent, EventDetails};
use crate::model::{
    Actor, BlockedDossier, DossierStatus, Impact, Party, ResolutionMethod, Urgency,
};

/// Request to refer a dossier upward.
#[derive(Debug, Clone)]
pub struct EscalateRequest {
    /// Party the dossier is escalated to.
    pub escalated_to: Party,
    /// Reason for the escalation. Must be non-empty.
    pub reason: String,
    /// Stated urgency.
    pub urgency: Urgency,
    /// New deadline, if the escalation imposes one.
    pub deadline: Option<DateTime<Utc>>,
}

/// Request to close a dossier.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// How the dossier is being unblocked.
    pub method: ResolutionMethod,
    /// Decision text. Must be non-empty; for substitution resolutions it
    /// is the decision bound into the substitution chain.
    pub comment: String,
    /// Supporting documents to append to the dossier's list.
    pub documents: Vec<String>,
    /// Delegation invoked, for delegation resolutions.
    pub delegation_ref: Option<String>,
}

fn ensure_not_resolved(dossier: &BlockedDossier) -> Result<(), LifecycleError> {
    if dossier.is_resolved() {
        return Err(LifecycleError::AlreadyResolved {
            dossier_id: dossier.id.clone(),
        });
    }
    Ok(())
}

/// Refers the dossier upward, incrementing its escalation level.
///
/// A critical-urgency escalation on a not-yet-critical dossier promotes
/// the impact to critical and doubles the priority. Re-escalating an
/// already escalated dossier is allowed; resolving is terminal.
pub fn escalate(
    dossier: &mut BlockedDossier,
    request: &EscalateRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    ensure_not_resolved(dossier)?;
    if request.reason.trim().is_empty() {
        return Err(LifecycleError::MissingField {
            name: "reason".to_owned(),
        });
    }

    let new_level = dossier.escalation_level.saturating_add(1);
    let promote = request.urgency == Urgency::Critical && dossier.impact != Impact::Critical;

    let event = seal(
        &dossier.id,
        &dossier.head_hash,
        actor,
        format!(
            "escalated to {} (level {new_level}, urgency {})",
            request.escalated_to.name,
            request.urgency.as_str()
        ),
        EventDetails::Escalated {
            escalated_to: request.escalated_to.clone(),
            reason: request.reason.clone(),
            urgency: request.urgency,
            level: new_level,
            deadline: request.deadline,
        },
        now,
    )?;

    dossier.escalation_level = new_level;
    if promote {
        dossier.impact = Impact::Critical;
        dossier.priority = dossier.priority.saturating_mul(2);
    }
    dossier.status = DossierStatus::Escalated;
    dossier.escalated_to = Some(request.escalated_to.clone());
    if request.deadline.is_some() {
        dossier.due_date = request.deadline;
    }
    dossier.head_hash = event.hash.clone();
    Ok(event)
}

/// Derives the substitution-chain hash for a resolution.
///
/// Rooted at [`SUBSTITUTION_ROOT`], independent of the dossier's primary
/// chain: the legal evidentiary trail must stand on its own.
fn derive_substitution_hash(
    dossier: &BlockedDossier,
    actor: &Actor,
    decision: &str,
    now: DateTime<Utc>,
) -> Result<String, LifecycleError> {
    let payload = json!({
        "dossier_id": dossier.id,
        "subject": dossier.subject,
        "actor": serde_json::to_value(actor).map_err(crate::ledger::LedgerError::from)?,
        "decision": decision,
        "timestamp": now.to_rfc3339(),
    });
    Ok(derive_hash(SUBSTITUTION_ROOT, &payload))
}

/// Closes the dossier. Terminal: any further escalate/resolve rejects
/// with `AlreadyResolved` and leaves the aggregate untouched.
pub fn resolve(
    dossier: &mut BlockedDossier,
    request: &ResolveRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<AuditEvent, LifecycleError> {
    ensure_not_resolved(dossier)?;
    if request.comment.trim().is_empty() {
        return Err(LifecycleError::MissingField {
            name: "comment".to_owned(),
        });
    }

    let (substitution_hash, substitution_ref) = if request.method == ResolutionMethod::Substitution
    {
        let hash = derive_substitution_hash(dossier, actor, &request.comment, now)?;
        let reference = format!("SUB-{}-{}", now.format("%Y%m%d"), &hash[..8]);
        (Some(hash), Some(reference))
    } else {
        (None, None)
    };

    let event = seal(
        &dossier.id,
        &dossier.head_hash,
        actor,
        format!("resolved via {}", request.method),
        EventDetails::Resolved {
            method: request.method,
            comment: request.comment.clone(),
            delegation_ref: request.delegation_ref.clone(),
            substitution_hash: substitution_hash.clone(),
            substitution_ref: substitution_ref.clone(),
        },
        now,
    )?;

    dossier.status = DossierStatus::Resolved;
    dossier.resolution_method = Some(request.method);
    dossier.resolution_comment = Some(request.comment.clone());
    // Resolution documents accumulate; earlier evidence is never replaced.
    dossier.documents.extend(request.documents.iter().cloned());
    dossier.substitution_hash = substitution_hash;
    dossier.substitution_ref = substitution_ref;
    dossier.head_hash = event.hash.clone();
    Ok(event)
}
