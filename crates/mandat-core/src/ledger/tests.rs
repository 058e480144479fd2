//! Tests for event sealing and chain verification.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use super::*;
use crate::crypto::GENESIS_ROOT;

fn actor() -> Actor {
    Actor::new("agent-7", "D. Moreau", "chef_de_bureau")
}

/// Builds a valid chain of `n` suspension/reactivation events.
fn chain_of(n: usize) -> Vec<AuditEvent> {
    let mut events = Vec::with_capacity(n);
    let mut previous = GENESIS_ROOT.to_owned();
    let start = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
    for i in 0..n {
        let details = if i % 2 == 0 {
            EventDetails::Suspended {
                reason: format!("audit interne {i}"),
            }
        } else {
            EventDetails::Reactivated
        };
        let event = seal(
            "del-1",
            &previous,
            &actor(),
            format!("transition {i}"),
            details,
            start + Duration::minutes(i as i64),
        )
        .expect("seal");
        previous = event.hash.clone();
        events.push(event);
    }
    events
}

#[test]
fn sealed_event_links_to_previous() {
    let events = chain_of(3);
    assert_eq!(events[0].previous_hash, GENESIS_ROOT);
    assert_eq!(events[1].previous_hash, events[0].hash);
    assert_eq!(events[2].previous_hash, events[1].hash);
    assert_eq!(events[0].action, "suspended");
    assert_eq!(events[1].action, "reactivated");
}

#[test]
fn empty_chain_verifies() {
    let result = verify(&[]).expect("verify");
    assert!(result.is_valid());
    assert_eq!(result.events_checked, 0);
}

#[test]
fn intact_chain_verifies() {
    let events = chain_of(5);
    let result = verify(&events).expect("verify");
    assert!(result.is_valid());
    assert_eq!(result.events_checked, 5);
}

#[test]
fn edited_summary_faults_at_its_own_index() {
    let mut events = chain_of(5);
    events[2].summary = "rewritten after the fact".to_owned();
    let result = verify(&events).expect("verify");
    assert!(!result.is_valid());
    let (index, kind) = result.first_fault.expect("fault");
    assert_eq!(index, 2);
    assert!(matches!(kind, ChainFaultKind::PayloadMismatch { .. }));
}

#[test]
fn edited_details_faults() {
    let mut events = chain_of(4);
    events[0].details = EventDetails::Suspended {
        reason: "different reason".to_owned(),
    };
    let result = verify(&events).expect("verify");
    assert_eq!(result.first_fault.expect("fault").0, 0);
}

#[test]
fn relinked_event_reports_broken_link() {
    let mut events = chain_of(4);
    // Splice event 2 onto a forged predecessor.
    events[2].previous_hash = events[0].hash.clone();
    let result = verify(&events).expect("verify");
    let (index, kind) = result.first_fault.expect("fault");
    assert_eq!(index, 2);
    assert!(matches!(kind, ChainFaultKind::BrokenLink { .. }));
}

#[test]
fn substitution_root_is_independent() {
    let details = EventDetails::Resolved {
        method: ResolutionMethod::Direct,
        comment: "vu et approuvé".to_owned(),
        delegation_ref: None,
        substitution_hash: None,
        substitution_ref: None,
    };
    let created = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
    let genesis_rooted = seal("dos-1", GENESIS_ROOT, &actor(), "s", details.clone(), created)
        .expect("seal");
    let substitution_rooted = seal(
        "dos-1",
        crate::crypto::SUBSTITUTION_ROOT,
        &actor(),
        "s",
        details,
        created,
    )
    .expect("seal");
    assert_ne!(genesis_rooted.hash, substitution_rooted.hash);

    // A genesis verifier rejects a substitution-rooted first event.
    let result = verify(std::slice::from_ref(&substitution_rooted)).expect("verify");
    assert!(matches!(
        result.first_fault,
        Some((0, ChainFaultKind::BrokenLink { .. }))
    ));
}

proptest! {
    /// Altering any single event's summary breaks verification at exactly
    /// that index; leaving the chain untouched keeps it valid.
    #[test]
    fn tampering_detected_at_altered_index(len in 1usize..8, target in 0usize..8) {
        prop_assume!(target < len);
        let mut events = chain_of(len);

        prop_assert!(verify(&events).expect("verify").is_valid());

        events[target].summary.push_str(" (edited)");
        let result = verify(&events).expect("verify");
        let (index, _) = result.first_fault.expect("tampering must be detected");
        prop_assert_eq!(index, target);
    }
}
