//! Precondition and validation errors for lifecycle transitions.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::model::DelegationStatus;

/// A lifecycle operation was refused before any mutation took place.
///
/// These map to a caller's 400/409 boundary; they are distinct from
/// business-rule rejections (a [`crate::policy::Decision`] value) and from
/// infrastructure failures (`StoreError`).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The dossier already reached its terminal state.
    #[error("dossier {dossier_id} is already resolved")]
    AlreadyResolved {
        /// The resolved dossier.
        dossier_id: String,
    },

    /// The aggregate's current state does not admit the requested action.
    #[error("invalid transition for {aggregate_id}: cannot {action} from {from}")]
    InvalidTransition {
        /// The aggregate refusing the transition.
        aggregate_id: String,
        /// Current state name.
        from: String,
        /// The refused action.
        action: String,
    },

    /// A required field was absent or empty.
    #[error("missing required field '{name}'")]
    MissingField {
        /// Name of the missing field.
        name: String,
    },

    /// `use` was attempted on a delegation that is not active.
    #[error("delegation {delegation_id} is {status}, not active")]
    DelegationNotActive {
        /// The delegation.
        delegation_id: String,
        /// Its current status.
        status: DelegationStatus,
    },

    /// `use` was attempted outside the validity window.
    #[error("delegation {delegation_id} is outside its validity window")]
    OutsideValidityWindow {
        /// The delegation.
        delegation_id: String,
    },

    /// `use` was attempted with the daily operation budget already
    /// consumed. Checked again inside the transaction so concurrent uses
    /// cannot both take the last slot.
    #[error("delegation {delegation_id} has consumed its daily budget of {max_daily_ops}")]
    DailyOpsExhausted {
        /// The delegation.
        delegation_id: String,
        /// The configured daily budget.
        max_daily_ops: u32,
    },

    /// `use` would push the cumulative amount over its ceiling. Checked
    /// again inside the transaction, like the daily budget.
    #[error("delegation {delegation_id} would exceed its total amount ceiling {max_total_amount}")]
    TotalAmountExhausted {
        /// The delegation.
        delegation_id: String,
        /// The configured cumulative ceiling.
        max_total_amount: u64,
    },

    /// The ledger event could not be sealed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
