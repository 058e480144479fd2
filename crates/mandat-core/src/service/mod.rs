//! Operation surface of the governance core.
//!
//! [`GovernanceService`] wires the pure evaluation functions and the
//! lifecycle state machines to the store and notifier ports:
//!
//! - `simulate` is read-only: it runs the policy evaluator and the risk
//!   detector against the same inputs and never touches the ledger.
//! - Mutating operations load the aggregate, apply the transition, and
//!   commit the updated aggregate together with its single new ledger
//!   event. A commit conflict (another writer advanced the chain head)
//!   triggers a reload-and-retry up to the configured attempt budget.
//! - Notifications go out after a successful commit and are best-effort:
//!   a delivery failure is logged and swallowed, never propagated.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::ledger::{self, AuditEvent, LedgerError, VerificationResult};
use crate::lifecycle::{
    self, EscalateRequest, ExtendRequest, LifecycleError, ResolveRequest, SuspendRequest,
    UseRequest,
};
use crate::model::{ActionContext, Actor, BlockedDossier, Delegation};
use crate::notify::Notifier;
use crate::policy::{self, Decision};
use crate::risk::{self, Risk};
use crate::store::{GovernanceStore, StoreError};


/// Errors surfaced by the operation layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Infrastructure failure from the store port.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Precondition or validation failure from a state machine.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Ledger sealing or verification failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The commit kept conflicting after the retry budget was exhausted.
    #[error("commit conflict on {aggregate_id} after {attempts} attempt(s)")]
    RetriesExhausted {
        /// The contended aggregate.
        aggregate_id: String,
        /// Attempts made.
        attempts: u32,
    },
}

/// Result of a read-only simulation: the policy decision and the
/// advisory risks, side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    /// Policy verdict with reasons and required controls.
    pub decision: Decision,
    /// Advisory findings; informational, never blocking.
    pub risks: Vec<Risk>,
}

/// A committed delegation transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationChange {
    /// The aggregate after the transition.
    pub delegation: Delegation,
    /// The single ledger event the transition appended.
    pub event: AuditEvent,
}

/// A committed dossier transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DossierChange {
    /// The aggregate after the transition.
    pub dossier: BlockedDossier,
    /// The single ledger event the transition appended.
    pub event: AuditEvent,
    /// The new chain head (equals `event.hash`).
    pub audit_hash: String,
}

/// Governance core entry point over injected store and notifier ports.
pub struct GovernanceService<S, N> {
    store: S,
    notifier: N,
    config: CoreConfig,
}

impl<S: GovernanceStore, N: Notifier> GovernanceService<S, N> {
    /// Creates a service with default configuration.
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_config(store, notifier, CoreConfig::default())
    }

    /// Creates a service with explicit configuration.
    pub fn with_config(store: S, notifier: N, config: CoreConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Read access to the underlying store port.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluates an action without side effects.
    ///
    /// Runs the policy evaluator and the risk detector against the same
    /// delegation snapshot and context. Never mutates, never appends.
    pub fn simulate(
        &self,
        delegation_id: &str,
        context: &ActionContext,
    ) -> Result<Simulation, ServiceError> {
        let delegation = self.store.load_delegation(delegation_id)?;
        let decision = policy::evaluate(&delegation, context);
        let risks = risk::detect(&delegation, context);
        debug!(
            delegation_id,
            verdict = ?decision.verdict,
            risk_count = risks.len(),
            "simulated action"
        );
        Ok(Simulation { decision, risks })
    }

    /// Records one exercise of delegated authority.
    pub fn record_use(
        &self,
        delegation_id: &str,
        request: &UseRequest,
        actor: &Actor,
    ) -> Result<DelegationChange, ServiceError> {
        self.mutate_delegation(delegation_id, |delegation, now| {
            lifecycle::use_delegation(delegation, request, actor, now)
        })
    }

    /// Extends a delegation's validity window.
    pub fn extend(
        &self,
        delegation_id: &str,
        request: &ExtendRequest,
        actor: &Actor,
    ) -> Result<DelegationChange, ServiceError> {
        self.mutate_delegation(delegation_id, |delegation, now| {
            lifecycle::extend(delegation, request, actor, now)
        })
    }

    /// Suspends a delegation.
    pub fn suspend(
        &self,
        delegation_id: &str,
        request: &SuspendRequest,
        actor: &Actor,
    ) -> Result<DelegationChange, ServiceError> {
        self.mutate_delegation(delegation_id, |delegation, now| {
            lifecycle::suspend(delegation, request, actor, now)
        })
    }

    /// Lifts a suspension.
    pub fn reactivate(
        &self,
        delegation_id: &str,
        actor: &Actor,
    ) -> Result<DelegationChange, ServiceError> {
        self.mutate_delegation(delegation_id, |delegation, now| {
            lifecycle::reactivate(delegation, actor, now)
        })
    }

    /// Permanently revokes a delegation.
    pub fn revoke(
        &self,
        delegation_id: &str,
        request: &SuspendRequest,
        actor: &Actor,
    ) -> Result<DelegationChange, ServiceError> {
        self.mutate_delegation(delegation_id, |delegation, now| {
            lifecycle::revoke(delegation, request, actor, now)
        })
    }

    /// Refers a dossier upward.
    pub fn escalate(
        &self,
        dossier_id: &str,
        request: &EscalateRequest,
        actor: &Actor,
    ) -> Result<DossierChange, ServiceError> {
        self.mutate_dossier(dossier_id, |dossier, now| {
            lifecycle::escalate(dossier, request, actor, now)
        })
    }

    /// Closes a dossier.
    pub fn resolve(
        &self,
        dossier_id: &str,
        request: &ResolveRequest,
        actor: &Actor,
    ) -> Result<DossierChange, ServiceError> {
        self.mutate_dossier(dossier_id, |dossier, now| {
            lifecycle::resolve(dossier, request, actor, now)
        })
    }

    /// Replays and verifies an aggregate's primary chain.
    pub fn verify_chain(&self, aggregate_id: &str) -> Result<VerificationResult, ServiceError> {
        let events = self.store.load_events(aggregate_id)?;
        Ok(ledger::verify(&events)?)
    }

    fn mutate_delegation<F>(
        &self,
        delegation_id: &str,
        transition: F,
    ) -> Result<DelegationChange, ServiceError>
    where
        F: Fn(
            &mut Delegation,
            chrono::DateTime<Utc>,
        ) -> Result<AuditEvent, LifecycleError>,
    {
        let now = Utc::now();
        for attempt in 1..=self.config.max_commit_retries {
            let mut delegation = self.store.load_delegation(delegation_id)?;
            let expected_head = delegation.head_hash.clone();
            let event = transition(&mut delegation, now)?;
            match self
                .store
                .commit_delegation(&delegation, &event, &expected_head)
            {
                Ok(()) => {
                    info!(
                        delegation_id,
                        action = %event.action,
                        head = %event.hash,
                        "delegation transition committed"
                    );
                    self.emit(&event);
                    return Ok(DelegationChange { delegation, event });
                }
                Err(StoreError::Conflict { .. }) => {
                    warn!(delegation_id, attempt, "commit conflict, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(ServiceError::RetriesExhausted {
            aggregate_id: delegation_id.to_owned(),
            attempts: self.config.max_commit_retries,
        })
    }

    fn mutate_dossier<F>(
        &self,
        dossier_id: &str,
        transition: F,
    ) -> Result<DossierChange, ServiceError>
    where
        F: Fn(
            &mut BlockedDossier,
            chrono::DateTime<Utc>,
        ) -> Result<AuditEvent, LifecycleError>,
    {
        let now = Utc::now();
        for attempt in 1..=self.config.max_commit_retries {
            let mut dossier = self.store.load_dossier(dossier_id)?;
            let expected_head = dossier.head_hash.clone();
            let event = transition(&mut dossier, now)?;
            match self.store.commit_dossier(&dossier, &event, &expected_head) {
                Ok(()) => {
                    info!(
                        dossier_id,
                        action = %event.action,
                        head = %event.hash,
                        "dossier transition committed"
                    );
                    self.emit(&event);
                    let audit_hash = event.hash.clone();
                    return Ok(DossierChange {
                        dossier,
                        event,
                        audit_hash,
                    });
                }
                Err(StoreError::Conflict { .. }) => {
                    warn!(dossier_id, attempt, "commit conflict, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(ServiceError::RetriesExhausted {
            aggregate_id: dossier_id.to_owned(),
            attempts: self.config.max_commit_retries,
        })
    }

    /// Best-effort notification after a committed transition.
    fn emit(&self, event: &AuditEvent) {
        let payload = json!({
            "aggregate_id": event.aggregate_id,
            "action": event.action,
            "summary": event.summary,
            "hash": event.hash,
        });
        if let Err(error) = self.notifier.notify(&event.action, &payload) {
            warn!(
                aggregate_id = %event.aggregate_id,
                action = %event.action,
                %error,
                "notification failed; transition already committed"
            );
        }
    }
}
