//! State machines for delegation management and dossier escalation.
//!
//! Each operation validates its preconditions against the current
//! aggregate, then applies the mutation and seals exactly one ledger
//! event, advancing the aggregate's `head_hash`. Validation failures
//! leave the aggregate untouched.
//!
//! These functions are transport-free: the [`crate::service`] layer wraps
//! them in the load / transition / commit cycle against the store port.

mod delegation;
mod dossier;
mod error;


pub use delegation::{
    extend, reactivate, revoke, suspend, use_delegation, ExtendRequest, SuspendRequest,
    UseRequest,
};
pub use dossier::{escalate, resolve, EscalateRequest, ResolveRequest};
pub use error::LifecycleError;
