//! `SQLite`-backed store adapter.
//!
//! Uses WAL mode for concurrent reads. Aggregates live in a single table
//! as JSON documents with the chain head promoted to a guarded column;
//! audit events are protected by append-only triggers (see `schema.sql`).

// Mutex poisoning indicates a panic in another thread, which is
// unrecoverable.
#![allow(clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{GovernanceStore, StoreError};
use crate::ledger::{AuditEvent, EventDetails};
use crate::model::{Actor, BlockedDossier, Delegation};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const KIND_DELEGATION: &str = "delegation";
const KIND_DOSSIER: &str = "dossier";

/// [`GovernanceStore`] backed by `SQLite`.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert_aggregate(
        &self,
        id: &str,
        kind: &str,
        head_hash: &str,
        document: String,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO aggregates (id, kind, head_hash, document)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, kind, head_hash, document],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists {
                aggregate_id: id.to_owned(),
            });
        }
        Ok(())
    }

    fn load_document(&self, id: &str, kind: &str) -> Result<String, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT document FROM aggregates WHERE id = ?1 AND kind = ?2",
            params![id, kind],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            aggregate_id: id.to_owned(),
        })
    }

    /// Guarded aggregate update plus event insert in one transaction.
    fn commit_aggregate(
        &self,
        id: &str,
        kind: &str,
        new_head: &str,
        document: String,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE aggregates SET head_hash = ?1, document = ?2
             WHERE id = ?3 AND kind = ?4 AND head_hash = ?5",
            params![new_head, document, id, kind, expected_head],
        )?;
        if updated == 0 {
            let exists: Option<String> = tx
                .query_row(
                    "SELECT head_hash FROM aggregates WHERE id = ?1 AND kind = ?2",
                    params![id, kind],
                    |row| row.get(0),
                )
                .optional()?;
            // Roll back the (empty) transaction before reporting.
            drop(tx);
            return Err(match exists {
                None => StoreError::NotFound {
                    aggregate_id: id.to_owned(),
                },
                Some(_) => StoreError::Conflict {
                    aggregate_id: id.to_owned(),
                    expected: expected_head.to_owned(),
                },
            });
        }

        tx.execute(
            "INSERT INTO audit_events
             (id, aggregate_id, action, actor, summary, details, previous_hash, hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.id,
                event.aggregate_id,
                event.action,
                serde_json::to_string(&event.actor)?,
                event.summary,
                serde_json::to_string(&event.details)?,
                event.previous_hash,
                event.hash,
                event.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, document: &str) -> Result<T, StoreError> {
    serde_json::from_str(document).map_err(|e| StoreError::Corrupt {
        aggregate_id: id.to_owned(),
        detail: e.to_string(),
    })
}

fn decode_timestamp(aggregate_id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            aggregate_id: aggregate_id.to_owned(),
            detail: format!("bad created_at '{raw}': {e}"),
        })
}

impl GovernanceStore for SqliteStore {
    fn insert_delegation(&self, delegation: &Delegation) -> Result<(), StoreError> {
        let document = serde_json::to_string(delegation)?;
        self.insert_aggregate(
            &delegation.id,
            KIND_DELEGATION,
            &delegation.head_hash,
            document,
        )
    }

    fn load_delegation(&self, id: &str) -> Result<Delegation, StoreError> {
        let document = self.load_document(id, KIND_DELEGATION)?;
        decode(id, &document)
    }

    fn commit_delegation(
        &self,
        delegation: &Delegation,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(delegation)?;
        self.commit_aggregate(
            &delegation.id,
            KIND_DELEGATION,
            &delegation.head_hash,
            document,
            event,
            expected_head,
        )
    }

    fn insert_dossier(&self, dossier: &BlockedDossier) -> Result<(), StoreError> {
        let document = serde_json::to_string(dossier)?;
        self.insert_aggregate(&dossier.id, KIND_DOSSIER, &dossier.head_hash, document)
    }

    fn load_dossier(&self, id: &str) -> Result<BlockedDossier, StoreError> {
        let document = self.load_document(id, KIND_DOSSIER)?;
        decode(id, &document)
    }

    fn commit_dossier(
        &self,
        dossier: &BlockedDossier,
        event: &AuditEvent,
        expected_head: &str,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(dossier)?;
        self.commit_aggregate(
            &dossier.id,
            KIND_DOSSIER,
            &dossier.head_hash,
            document,
            event,
            expected_head,
        )
    }

    fn load_events(&self, aggregate_id: &str) -> Result<Vec<AuditEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, aggregate_id, action, actor, summary, details,
                    previous_hash, hash, created_at
             FROM audit_events
             WHERE aggregate_id = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![aggregate_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, agg, action, actor, summary, details, previous_hash, hash, created_at) =
                row?;
            let actor: Actor = decode(&agg, &actor)?;
            let details: EventDetails = decode(&agg, &details)?;
            let created_at = decode_timestamp(&agg, &created_at)?;
            events.push(AuditEvent {
                id,
                aggregate_id: agg,
                action,
                actor,
                summary,
                details,
                previous_hash,
                hash,
                created_at,
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::crypto::GENESIS_ROOT;
    use crate::ledger::{seal, verify};
    use crate::model::Party;

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

    fn sealed_event(delegation: &Delegation, reason: &str) -> AuditEvent {
        seal(
            &delegation.id,
            &delegation.head_hash,
            &Actor::new("a-1", "A", "role"),
            format!("suspended: {reason}"),
            EventDetails::Suspended {
                reason: reason.to_owned(),
            },
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
        .expect("seal")
    }

    #[test]
    fn open_on_disk_and_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let store = SqliteStore::open(dir.path().join("governance.db")).expect("open");
        let d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");
        assert_eq!(store.load_delegation("del-1").expect("load"), d);
    }

    #[test]
    fn commit_persists_aggregate_and_event_together() {
        let store = SqliteStore::in_memory().expect("store");
        let mut d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");

        let event = sealed_event(&d, "audit");
        d.head_hash = event.hash.clone();
        store
            .commit_delegation(&d, &event, GENESIS_ROOT)
            .expect("commit");

        let loaded = store.load_delegation("del-1").expect("load");
        assert_eq!(loaded.head_hash, event.hash);
        let events = store.load_events("del-1").expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], event);
        assert!(verify(&events).expect("verify").is_valid());
    }

    #[test]
    fn stale_head_commit_conflicts_without_appending() {
        let store = SqliteStore::in_memory().expect("store");
        let mut d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");

        let event = sealed_event(&d, "first");
        d.head_hash = event.hash.clone();
        store
            .commit_delegation(&d, &event, GENESIS_ROOT)
            .expect("commit");

        let stale = sealed_event(&delegation("del-1"), "second");
        let result = store.commit_delegation(&d, &stale, GENESIS_ROOT);
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(store.load_events("del-1").expect("events").len(), 1);
    }

    #[test]
    fn missing_aggregate_reports_not_found() {
        let store = SqliteStore::in_memory().expect("store");
        assert!(matches!(
            store.load_delegation("nope"),
            Err(StoreError::NotFound { .. })
        ));
        let d = delegation("ghost");
        let event = sealed_event(&d, "x");
        assert!(matches!(
            store.commit_delegation(&d, &event, GENESIS_ROOT),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn stored_events_cannot_be_updated_or_deleted() {
        let store = SqliteStore::in_memory().expect("store");
        let mut d = delegation("del-1");
        store.insert_delegation(&d).expect("insert");
        let event = sealed_event(&d, "audit");
        d.head_hash = event.hash.clone();
        store
            .commit_delegation(&d, &event, GENESIS_ROOT)
            .expect("commit");

        let conn = store.conn.lock().unwrap();
        let update = conn.execute(
            "UPDATE audit_events SET summary = 'rewritten' WHERE id = ?1",
            params![event.id],
        );
        assert!(update.is_err());
        let delete = conn.execute("DELETE FROM audit_events WHERE id = ?1", params![event.id]);
        assert!(delete.is_err());
    }
}
