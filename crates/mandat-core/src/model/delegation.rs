//! Delegation aggregate: a bounded grant of authority.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::action::Party;
use crate::crypto::GENESIS_ROOT;

/// Lifecycle status of a delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    /// The delegation can authorize actions.
    Active,
    /// Temporarily suspended; can be reactivated.
    Suspended,
    /// Permanently withdrawn. Terminal.
    Revoked,
    /// Validity window elapsed. Reactivated only through `extend`.
    Expired,
}

impl DelegationStatus {
    /// Returns the string representation used in ledger payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scope constraint list with an explicit unrestricted case.
///
/// The persisted form is `null` (unrestricted) or a list of allowed
/// values. An empty list deserializes as [`Scope::Unrestricted`]: absence
/// of restriction is the open-policy default, and normalizing at the
/// boundary keeps the ambiguity from round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// No restriction: every candidate value is permitted.
    #[default]
    Unrestricted,
    /// Only the listed values are permitted.
    RestrictedTo(BTreeSet<String>),
}

impl Scope {
    /// Builds a restricted scope, normalizing an empty list to
    /// [`Scope::Unrestricted`].
    #[must_use]
    pub fn restricted_to<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Self::Unrestricted
        } else {
            Self::RestrictedTo(set)
        }
    }

    /// Returns `true` if the candidate value is permitted by this scope.
    #[must_use]
    pub fn permits(&self, candidate: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::RestrictedTo(set) => set.contains(candidate),
        }
    }

    /// Returns `true` if this scope imposes no restriction.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unrestricted => serializer.serialize_none(),
            Self::RestrictedTo(set) => serializer.collect_seq(set),
        }
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values: Option<Vec<String>> = Option::deserialize(deserializer)?;
        Ok(match values {
            None => Self::Unrestricted,
            Some(list) => Self::restricted_to(list),
        })
    }
}

/// Amount and frequency bounds on a delegation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationLimits {
    /// Maximum amount per single use (inclusive), minor units.
    #[serde(default)]
    pub max_per_use_amount: Option<u64>,
    /// Maximum cumulative amount across all uses (inclusive), minor units.
    #[serde(default)]
    pub max_total_amount: Option<u64>,
    /// Maximum operations per day, against `usage_count`.
    #[serde(default)]
    pub max_daily_ops: Option<u32>,
}

/// A time-bounded, amount-bounded grant of authority from a principal to
/// a delegate.
///
/// Running counters are monotonic: `usage_count` and `usage_total_amount`
/// never decrease. `head_hash` always equals the hash of the last ledger
/// event appended for this aggregate, or [`GENESIS_ROOT`] before the
/// first event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Aggregate identifier.
    pub id: String,
    /// The party receiving authority.
    pub delegate: Party,
    /// The party granting authority.
    pub principal: Party,
    /// Human-readable title of the grant.
    pub title: String,
    /// Current lifecycle status.
    pub status: DelegationStatus,
    /// Start of the validity window (inclusive).
    pub starts_at: DateTime<Utc>,
    /// End of the validity window (inclusive).
    pub ends_at: DateTime<Utc>,
    /// Amount and frequency bounds.
    #[serde(default)]
    pub limits: DelegationLimits,
    /// Allowed action kinds.
    #[serde(default)]
    pub allowed_actions: Scope,
    /// Allowed originating bureaux.
    #[serde(default)]
    pub bureaux: Scope,
    /// Allowed document types.
    #[serde(default)]
    pub document_types: Scope,
    /// When `true`, the delegate may never act as requester under this
    /// delegation; otherwise self-use triggers dual control.
    #[serde(default)]
    pub forbid_self_use: bool,
    /// Number of recorded uses in the caller-defined daily window.
    #[serde(default)]
    pub usage_count: u32,
    /// Cumulative amount across all recorded uses, minor units.
    #[serde(default)]
    pub usage_total_amount: u64,
    /// Timestamp of the last recorded use.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Target of the last recorded use.
    #[serde(default)]
    pub last_used_for: Option<String>,
    /// When the delegation was suspended, if currently suspended.
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,
    /// Actor id that suspended the delegation.
    #[serde(default)]
    pub suspended_by: Option<String>,
    /// Reason given at suspension.
    #[serde(default)]
    pub suspension_reason: Option<String>,
    /// Hash of the last appended ledger event for this aggregate.
    pub head_hash: String,
}

impl Delegation {
    /// Creates a new active delegation with a fresh (genesis) chain head.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        delegate: Party,
        principal: Party,
        title: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            delegate,
            principal,
            title: title.into(),
            status: DelegationStatus::Active,
            starts_at,
            ends_at,
            limits: DelegationLimits::default(),
            allowed_actions: Scope::Unrestricted,
            bureaux: Scope::Unrestricted,
            document_types: Scope::Unrestricted,
            forbid_self_use: false,
            usage_count: 0,
            usage_total_amount: 0,
            last_used_at: None,
            last_used_for: None,
            suspended_at: None,
            suspended_by: None,
            suspension_reason: None,
            head_hash: GENESIS_ROOT.to_owned(),
        }
    }

    /// Returns `true` if `at` falls within the validity window, inclusive
    /// at both ends.
    #[must_use]
    pub fn window_contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }

    /// Remaining cumulative headroom under `max_total_amount`, if set.
    #[must_use]
    pub fn remaining_total(&self) -> Option<u64> {
        self.limits
            .max_total_amount
            .map(|max| max.saturating_sub(self.usage_total_amount))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn empty_scope_list_normalizes_to_unrestricted() {
        let scope = Scope::restricted_to(Vec::<String>::new());
        assert!(scope.is_unrestricted());
        assert!(scope.permits("anything"));
    }

    #[test]
    fn restricted_scope_permits_members_only() {
        let scope = Scope::restricted_to(["spend", "validate"]);
        assert!(scope.permits("spend"));
        assert!(!scope.permits("approve"));
    }

    #[test]
    fn scope_round_trips_through_json() {
        let scope = Scope::restricted_to(["bureau-a"]);
        let json = serde_json::to_string(&scope).expect("serialize");
        assert_eq!(json, r#"["bureau-a"]"#);
        let back: Scope = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, scope);

        let open: Scope = serde_json::from_str("null").expect("deserialize null");
        assert!(open.is_unrestricted());
        let empty: Scope = serde_json::from_str("[]").expect("deserialize empty");
        assert!(empty.is_unrestricted());
    }

    #[test]
    fn validity_window_is_inclusive() {
        let starts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ends = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let delegation = Delegation::new(
            "del-1",
            Party::new("u-2", "B. Martin"),
            Party::new("u-1", "A. Dupont"),
            "Signature marchés",
            starts,
            ends,
        );
        assert!(delegation.window_contains(starts));
        assert!(delegation.window_contains(ends));
        assert!(!delegation.window_contains(ends + chrono::Duration::seconds(1)));
        assert_eq!(delegation.head_hash, GENESIS_ROOT);
    }
}
