//! Blocked dossier aggregate: a stalled administrative case under
//! escalation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::Party;
use crate::crypto::GENESIS_ROOT;

/// Lifecycle status of a blocked dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierStatus {
    /// Created, not yet referred upward.
    Pending,
    /// Referred upward at least once. May re-enter on further escalation.
    Escalated,
    /// Closed with a resolution method. Terminal.
    Resolved,
}

impl DossierStatus {
    /// Returns the string representation used in ledger payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for DossierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of the blockage's consequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

/// Urgency attached to an escalation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Returns the string representation used in ledger payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// How a dossier was unblocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Resolved by the original decision-maker.
    Direct,
    /// Resolved by the escalation target.
    Escalation,
    /// A higher authority acted in place of the original decision-maker.
    /// Requires the separate substitution evidentiary chain.
    Substitution,
    /// Resolved by granting or invoking a delegation.
    Delegation,
}

impl ResolutionMethod {
    /// Returns the string representation used in ledger payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Escalation => "escalation",
            Self::Substitution => "substitution",
            Self::Delegation => "delegation",
        }
    }
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stalled administrative case under escalation.
///
/// `priority` is monotonic non-decreasing under escalation and
/// `escalation_level` counts upward referrals. Once resolved, the
/// aggregate accepts no further transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDossier {
    /// Aggregate identifier.
    pub id: String,
    /// What the case is about.
    pub subject: String,
    /// Originating bureau.
    pub bureau: String,
    /// Current lifecycle status.
    pub status: DossierStatus,
    /// Severity of the blockage.
    pub impact: Impact,
    /// Scheduling priority; doubled when a critical escalation promotes
    /// the impact.
    pub priority: u32,
    /// Number of times the dossier was referred upward.
    #[serde(default)]
    pub escalation_level: u32,
    /// Current escalation target, if any.
    #[serde(default)]
    pub escalated_to: Option<Party>,
    /// Set exactly once, at resolution.
    #[serde(default)]
    pub resolution_method: Option<ResolutionMethod>,
    /// Decision text recorded at resolution.
    #[serde(default)]
    pub resolution_comment: Option<String>,
    /// Supporting document references, appended to and never replaced.
    #[serde(default)]
    pub documents: Vec<String>,
    /// Deadline from the latest escalation, if given.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Hash rooted at `"substitution"`, present only for substitution
    /// resolutions.
    #[serde(default)]
    pub substitution_hash: Option<String>,
    /// Generated reference for the substitution record.
    #[serde(default)]
    pub substitution_ref: Option<String>,
    /// Hash of the last appended ledger event for this aggregate.
    pub head_hash: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl BlockedDossier {
    /// Creates a new pending dossier with a fresh (genesis) chain head.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        bureau: impl Into<String>,
        impact: Impact,
        priority: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            bureau: bureau.into(),
            status: DossierStatus::Pending,
            impact,
            priority,
            escalation_level: 0,
            escalated_to: None,
            resolution_method: None,
            resolution_comment: None,
            documents: Vec::new(),
            due_date: None,
            substitution_hash: None,
            substitution_ref: None,
            head_hash: GENESIS_ROOT.to_owned(),
            created_at,
        }
    }

    /// Returns `true` once the dossier has reached its terminal state.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == DossierStatus::Resolved
    }
}
