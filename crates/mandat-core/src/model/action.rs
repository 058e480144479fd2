//! Actors and the ephemeral action context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named party: a principal, a delegate, or an escalation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Stable identifier of the party.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Party {
    /// Creates a new party.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The identity performing an operation, as recorded in the audit ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier of the actor.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Organizational role (e.g. `"directeur"`, `"agent_comptable"`).
    pub role: String,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// One candidate action under a delegation, described for evaluation.
///
/// Not persisted; constructed per `simulate`/`use` call. The same context
/// is fed to both the policy evaluator and the risk detector so that a
/// simulation sees exactly what a committed use would see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    /// Action kind (e.g. `"spend"`, `"validate"`, `"approve"`).
    pub action: String,
    /// Bureau the action originates from.
    pub bureau: String,
    /// Monetary amount in minor currency units. `None` for non-monetary
    /// actions such as document validation.
    pub amount: Option<u64>,
    /// ISO currency code for `amount`.
    pub currency: String,
    /// Document type the action applies to, if any.
    pub document_type: Option<String>,
    /// Reference of the concrete document, if any.
    pub document_ref: Option<String>,
    /// Identity requesting the action.
    pub requester: Party,
    /// When the action would take effect. Also the "now" used by the
    /// temporal and continuity checks.
    pub timestamp: DateTime<Utc>,
}

impl ActionContext {
    /// Creates a non-monetary action context.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        bureau: impl Into<String>,
        requester: Party,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            bureau: bureau.into(),
            amount: None,
            currency: "EUR".to_owned(),
            document_type: None,
            document_ref: None,
            requester,
            timestamp,
        }
    }

    /// Sets the monetary amount (minor units).
    #[must_use]
    pub fn with_amount(mut self, amount: u64, currency: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.currency = currency.into();
        self
    }

    /// Sets the target document type and reference.
    #[must_use]
    pub fn with_document(
        mut self,
        document_type: impl Into<String>,
        document_ref: impl Into<String>,
    ) -> Self {
        self.document_type = Some(document_type.into());
        self.document_ref = Some(document_ref.into());
        self
    }
}
