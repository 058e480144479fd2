//! Hash-chained audit ledger records.
//!
//! Every state transition on a delegation or dossier appends exactly one
//! [`AuditEvent`]. Events are immutable once sealed and totally ordered
//! per aggregate; there is no global order across unrelated aggregates.
//!
//! An event's hash covers its action, actor, summary, typed details, and
//! creation time, chained to the previous event's hash (or the chain root
//! sentinel). Any retroactive edit to a sealed event therefore invalidates
//! its own hash and every hash after it; [`verify`] reports the first
//! offending index.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::{derive_hash, ChainRoot};
use crate::model::{Actor, Party, ResolutionMethod, Urgency};

#[cfg(test)]
mod tests;

/// Errors raised while sealing or verifying ledger events.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An event payload could not be serialized for hashing.
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Typed per-action event payload.
///
/// One variant per ledger action kind, validated at construction, instead
/// of a free-form metadata map. The serialized shape is stable: a `kind`
/// tag plus the variant fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventDetails {
    /// Validity window extended (possibly reactivating an expired grant).
    Extended {
        /// End of window before the extension.
        previous_end: DateTime<Utc>,
        /// End of window after the extension.
        new_end: DateTime<Utc>,
        /// `true` when the extension reactivated an expired delegation.
        reactivated: bool,
    },
    /// Delegation suspended.
    Suspended {
        /// Reason given by the suspending actor.
        reason: String,
    },
    /// Suspension lifted.
    Reactivated,
    /// Delegation permanently withdrawn.
    Revoked {
        /// Reason given by the revoking actor.
        reason: String,
    },
    /// Delegated authority exercised once.
    Used {
        /// Reference of the target document, if any.
        target_doc: Option<String>,
        /// Type of the target document, if any.
        target_doc_type: Option<String>,
        /// Amount committed by this use, minor units.
        amount: Option<u64>,
    },
    /// Dossier referred upward.
    Escalated {
        /// Party the dossier was escalated to.
        escalated_to: Party,
        /// Reason for the escalation.
        reason: String,
        /// Urgency stated by the escalating actor.
        urgency: Urgency,
        /// Escalation level after this referral.
        level: u32,
        /// Deadline set by the escalation, if any.
        deadline: Option<DateTime<Utc>>,
    },
    /// Dossier closed.
    Resolved {
        /// How the dossier was unblocked.
        method: ResolutionMethod,
        /// Decision text.
        comment: String,
        /// Delegation invoked to unblock, for delegation resolutions.
        delegation_ref: Option<String>,
        /// Substitution-chain hash, for substitution resolutions.
        substitution_hash: Option<String>,
        /// Generated substitution reference.
        substitution_ref: Option<String>,
    },
}

impl EventDetails {
    /// Returns the ledger action string for this payload kind.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Extended { .. } => "extended",
            Self::Suspended { .. } => "suspended",
            Self::Reactivated => "reactivated",
            Self::Revoked { .. } => "revoked",
            Self::Used { .. } => "used",
            Self::Escalated { .. } => "escalated",
            Self::Resolved { .. } => "resolved",
        }
    }
}

/// One immutable, hash-chained ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier (UUID v4).
    pub id: String,
    /// Aggregate (delegation or dossier) this event belongs to.
    pub aggregate_id: String,
    /// Action string, derived from the details variant.
    pub action: String,
    /// Identity that performed the transition.
    pub actor: Actor,
    /// Short human-readable summary.
    pub summary: String,
    /// Typed structured payload.
    pub details: EventDetails,
    /// Hash of the previous event, or the chain root sentinel.
    pub previous_hash: String,
    /// This event's chain hash.
    pub hash: String,
    /// Creation time; defines the per-aggregate order.
    pub created_at: DateTime<Utc>,
}

/// The hashed portion of an event, in canonical form.
///
/// Identifiers are excluded on purpose: the hash binds what happened, who
/// did it, and when, independent of storage-assigned ids.
fn payload_value(
    action: &str,
    actor: &Actor,
    summary: &str,
    details: &EventDetails,
    created_at: DateTime<Utc>,
) -> Result<Value, LedgerError> {
    Ok(json!({
        "action": action,
        "actor": serde_json::to_value(actor)?,
        "summary": summary,
        "details": serde_json::to_value(details)?,
        "created_at": created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    }))
}

/// Seals a new event onto an aggregate's chain.
///
/// Computes `hash = H(previous_hash ‖ canonical payload)` and returns the
/// completed record. The caller commits it together with the aggregate's
/// updated `head_hash` in one transaction.
pub fn seal(
    aggregate_id: &str,
    previous_hash: &str,
    actor: &Actor,
    summary: impl Into<String>,
    details: EventDetails,
    created_at: DateTime<Utc>,
) -> Result<AuditEvent, LedgerError> {
    let summary = summary.into();
    let action = details.action();
    let payload = payload_value(action, actor, &summary, &details, created_at)?;
    let hash = derive_hash(previous_hash, &payload);
    Ok(AuditEvent {
        id: Uuid::new_v4().to_string(),
        aggregate_id: aggregate_id.to_owned(),
        action: action.to_owned(),
        actor: actor.clone(),
        summary,
        details,
        previous_hash: previous_hash.to_owned(),
        hash,
        created_at,
    })
}

/// Why a chain failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainFaultKind {
    /// The stored `previous_hash` does not match the prior event's hash.
    BrokenLink {
        /// Hash the link should have carried.
        expected: String,
        /// Hash the link actually carries.
        actual: String,
    },
    /// The stored hash does not match the recomputed payload hash.
    PayloadMismatch {
        /// Recomputed hash.
        expected: String,
        /// Stored hash.
        actual: String,
    },
}

/// Outcome of replaying an aggregate's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Number of events examined (stops at the first fault).
    pub events_checked: usize,
    /// Index of the first faulty event, with the fault kind.
    pub first_fault: Option<(usize, ChainFaultKind)>,
}

impl VerificationResult {
    /// Returns `true` when every recomputed hash matched.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.first_fault.is_none()
    }
}

/// Replays a `"genesis"`-rooted chain, recomputing every hash.
pub fn verify(events: &[AuditEvent]) -> Result<VerificationResult, LedgerError> {
    verify_rooted(ChainRoot::Genesis, events)
}

/// Replays a chain from the given root, recomputing each event's hash
/// from its payload and the previously computed hash.
///
/// The chain is valid iff every stored hash equals the recomputed one, in
/// order. Verification stops at the first fault; later events are not
/// examined because their expected hashes are already undefined.
pub fn verify_rooted(
    root: ChainRoot,
    events: &[AuditEvent],
) -> Result<VerificationResult, LedgerError> {
    let mut expected_previous = root.sentinel().to_owned();
    for (index, event) in events.iter().enumerate() {
        if event.previous_hash != expected_previous {
            return Ok(VerificationResult {
                events_checked: index + 1,
                first_fault: Some((
                    index,
                    ChainFaultKind::BrokenLink {
                        expected: expected_previous,
                        actual: event.previous_hash.clone(),
                    },
                )),
            });
        }
        let payload = payload_value(
            &event.action,
            &event.actor,
            &event.summary,
            &event.details,
            event.created_at,
        )?;
        let recomputed = derive_hash(&expected_previous, &payload);
        if recomputed != event.hash {
            return Ok(VerificationResult {
                events_checked: index + 1,
                first_fault: Some((
                    index,
                    ChainFaultKind::PayloadMismatch {
                        expected: recomputed,
                        actual: event.hash.clone(),
                    },
                )),
            });
        }
        expected_previous = recomputed;
    }
    Ok(VerificationResult {
        events_checked: events.len(),
        first_fault: None,
    })
}
