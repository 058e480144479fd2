//! Durable-store port and the bundled reference adapters.
//!
//! The core mutates aggregates only through [`GovernanceStore`]: read the
//! current aggregate (including its `head_hash`), compute the new state
//! and one ledger event, then commit both in a single atomic write guarded
//! by the `head_hash` read at the start. A stale guard yields
//! [`StoreError::Conflict`] and the caller retries; this serializes
//! concurrent mutations per aggregate and keeps every chain strictly
//! linear. Mutations on different aggregates are independent.
//!
//! Two adapters ship with the crate: [`MemoryStore`] for tests and hosts
//! with their own durability, and [`SqliteStore`], a WAL-mode `SQLite`
//! implementation with append-only enforcement on the audit table.

mod memory;
mod sqlite;

use thiserror::Error;

use crate::ledger::AuditEvent;
use crate::model::{BlockedDossier, Delegation};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors surfaced by store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No aggregate with the given id.
    #[error("aggregate not found: {aggregate_id}")]
    NotFound {
        /// The missing aggregate id.
        aggregate_id: String,
    },

    /// The aggregate was mutated since it was read; the commit was
    /// refused to keep the chain linear.
    #[error("stale head for {aggregate_id}: expected {expected}")]
    Conflict {
        /// The contended aggregate id.
        aggregate_id: String,
        /// The head hash the caller based its mutation on.
        expected: String,
    },

    /// An aggregate with the given id already exists.
    #[error("aggregate already exists: {aggregate_id}")]
    AlreadyExists {
        /// The duplicate aggregate id.
        aggregate_id: String,
    },

    /// A stored record could not be decoded.
    #[error("corrupt record for {aggregate_id}: {detail}")]
    Corrupt {
        /// The aggregate whose record is unreadable.
        aggregate_id: String,
        /// What failed to decode.
        detail: String,
    },

    /// Serialization of an aggregate or event failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Port over durable storage for delegations, dossiers, and their audit
/// chains.
///
/// # Contracts
///
/// - `commit_*` writes the updated aggregate and the appended event in
///   one transaction, or neither: no event ever exists without its
///   aggregate update, and vice versa.
/// - `commit_*` fails with [`StoreError::Conflict`] when the stored
///   `head_hash` no longer equals `expected_head`.
/// - Stored events are immutable; `load_events` returns them in append
///   order for one aggregate only.
pub trait GovernanceStore: Send + Sync {
    /// Creates a new delegation aggregate.
    fn insert_delegation(&self, delegation: &Delegation) -> Result<(), StoreError>;

    /// Loads a delegation by id.
    fn load_delegation(&self, id: &str) -> Result<Delegation, StoreError>;

    /// Atomically writes an updated delegation and its new ledger event,
    /// guarded by the head hash read at the start of the operation.
    fn commit_delegation(
        &self,
        delegation: &Delegation,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError>;

    /// Creates a new dossier aggregate.
    fn insert_dossier(&self, dossier: &BlockedDossier) -> Result<(), StoreError>;

    /// Loads a dossier by id.
    fn load_dossier(&self, id: &str) -> Result<BlockedDossier, StoreError>;

    /// Atomically writes an updated dossier and its new ledger event,
    /// guarded by the head hash read at the start of the operation.
    fn commit_dossier(
        &self,
        dossier: &BlockedDossier,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError>;

    /// Returns all events for one aggregate, in append order.
    fn load_events(&self, aggregate_id: &str) -> Result<Vec<AuditEvent>, StoreError>;
}
