//! Core data model for delegated authority and blocked dossiers.
//!
//! These types are plain serde-serializable values. All policy and
//! lifecycle logic lives in the [`crate::policy`], [`crate::risk`], and
//! [`crate::lifecycle`] modules; the model itself carries only data and
//! cheap accessors.

mod action;
mod delegation;
mod dossier;

pub use action::{ActionContext, Actor, Party};
pub use delegation::{Delegation, DelegationLimits, DelegationStatus, Scope};
pub use dossier::{BlockedDossier, DossierStatus, Impact, ResolutionMethod, Urgency};
