//! In-memory store adapter.

// Mutex poisoning indicates a panic in another thread, which is
// unrecoverable.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Mutex;

use super::{GovernanceStore, StoreError};
use crate::ledger::AuditEvent;
use crate::model::{BlockedDossier, Delegation};

#[derive(Debug, Default)]
struct Inner {
    delegations: HashMap<String, Delegation>,
    dossiers: HashMap<String, BlockedDossier>,
    events: HashMap<String, Vec<AuditEvent>>,
}

/// Thread-safe in-memory [`GovernanceStore`].
///
/// A single mutex covers aggregates and events, so each commit is atomic
/// by construction. Suited to tests and to hosts that own durability
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all aggregates.
    #[must_use]
    pub fn event_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.events.values().map(Vec::len).sum()
    }
}

impl GovernanceStore for MemoryStore {
    fn insert_delegation(&self, delegation: &Delegation) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.delegations.contains_key(&delegation.id) {
            return Err(StoreError::AlreadyExists {
                aggregate_id: delegation.id.clone(),
            });
        }
        inner
            .delegations
            .insert(delegation.id.clone(), delegation.clone());
        Ok(())
    }

    fn load_delegation(&self, id: &str) -> Result<Delegation, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .delegations
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                aggregate_id: id.to_owned(),
            })
    }

    fn commit_delegation(
        &self,
        delegation: &Delegation,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .delegations
            .get(&delegation.id)
            .ok_or_else(|| StoreError::NotFound {
                aggregate_id: delegation.id.clone(),
            })?;
        if stored.head_hash != expected_head {
            return Err(StoreError::Conflict {
                aggregate_id: delegation.id.clone(),
                expected: expected_head.to_owned(),
            });
        }
        inner
            .delegations
            .insert(delegation.id.clone(), delegation.clone());
        inner
            .events
            .entry(delegation.id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn insert_dossier(&self, dossier: &BlockedDossier) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.dossiers.contains_key(&dossier.id) {
            return Err(StoreError::AlreadyExists {
                aggregate_id: dossier.id.clone(),
            });
        }
        inner.dossiers.insert(dossier.id.clone(), dossier.clone());
        Ok(())
    }

    fn load_dossier(&self, id: &str) -> Result<BlockedDossier, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .dossiers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                aggregate_id: id.to_owned(),
            })
    }

    fn commit_dossier(
        &self,
        dossier: &BlockedDossier,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .dossiers
            .get(&dossier.id)
            .ok_or_else(|| StoreError::NotFound {
                aggregate_id: dossier.id.clone(),
            })?;
        if stored.head_hash != expected_head {
            return Err(StoreError::Conflict {
                aggregate_id: dossier.id.clone(),
                expected: expected_head.to_owned(),
            });
        }
        inner.dossiers.insert(dossier.id.clone(), dossier.clone());
        inner
            .events
            .entry(dossier.id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn load_events(&self, aggregate_id: &str) -> Result<Vec<AuditEvent>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(aggregate_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::crypto::GENESIS_ROOT;
    use crate::ledger::{seal, EventDetails};
    use crate::model::{Actor, Party};

    fn delegation(id: &str) -> Delegation {
        Delegation::new(
            id,
            Party::new("delegate-1", "B. Martin"),
            Party::new("principal-1", "A. Dupont"),
            "Test",
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
        )
    }

    fn event_for(delegation: &Delegation) -> AuditEvent {
        seal(
            &delegation.id,
            &delegation.head_hash,
            &Actor::new("a-1", "A", "role"),
            "suspended: test",
            EventDetails::Suspended {
                reason: "test".to_owned(),
            },
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
        .expect("seal")
    }

    #[test]
    fn insert_then_load_round_trips() {
        let store = MemoryStore::new();
        let d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");
        assert_eq!(store.load_delegation("del-1").expect("load"), d);
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let store = MemoryStore::new();
        let d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");
        assert!(matches!(
            store.insert_delegation(&d),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn commit_with_stale_head_conflicts_and_writes_nothing() {
        let store = MemoryStore::new();
        let mut d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");

        let event = event_for(&d);
        d.head_hash = event.hash.clone();
        store
            .commit_delegation(&d, &event, GENESIS_ROOT)
            .expect("first commit");

        // A second writer still holding the genesis head must conflict.
        let stale_event = event_for(&delegation("del-1"));
        let result = store.commit_delegation(&d, &stale_event, GENESIS_ROOT);
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(store.event_count(), 1);
    }

    #[test]
    fn events_are_scoped_per_aggregate() {
        let store = MemoryStore::new();
        let mut a = delegation("del-a");
        let mut b = delegation("del-b");
        store.insert_delegation(&a).expect("insert a");
        store.insert_delegation(&b).expect("insert b");

        let ea = event_for(&a);
        a.head_hash = ea.hash.clone();
        store.commit_delegation(&a, &ea, GENESIS_ROOT).expect("commit a");

        let eb = event_for(&b);
        b.head_hash = eb.hash.clone();
        store.commit_delegation(&b, &eb, GENESIS_ROOT).expect("commit b");

        assert_eq!(store.load_events("del-a").expect("events").len(), 1);
        assert_eq!(store.load_events("del-b").expect("events").len(), 1);
        assert!(store.load_events("del-c").expect("events").is_empty());
    }
}
