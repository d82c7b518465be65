//! # Audit Trail
//!
//! Append-only history of state-changing actions on a case.
//!
//! Each entry carries a typed detail payload keyed by its action, so the
//! action name and the shape of its details can never disagree.
//!
//! ## Invariants
//!
//! - Entries are never edited or removed; `AuditLog` exposes no mutable access.
//! - Timestamps never decrease: an entry stamped earlier than its predecessor
//!   is clamped to the predecessor's timestamp.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, Role, Timestamp, UserId};
use std::fmt;

/// The action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Submitted,
    Assigned,
    Reassigned,
    Approved,
    Rejected,
    Donated,
    FullyFunded,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Assigned => "assigned",
            Self::Reassigned => "reassigned",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Donated => "donated",
            Self::FullyFunded => "fully_funded",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action-specific payload. The serde tag doubles as the entry's `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AuditDetails {
    Submitted {
        form_completion: u8,
        file_count: usize,
    },
    Assigned {
        checker_id: UserId,
    },
    Reassigned {
        previous_checker: Option<UserId>,
        checker_id: UserId,
    },
    Approved {
        final_damage_percentage: f64,
        estimated_cost: Amount,
        field_notes: Option<String>,
        self_assigned: bool,
    },
    Rejected {
        field_notes: Option<String>,
        self_assigned: bool,
    },
    Donated {
        amount: Amount,
        total_raised: Amount,
    },
    FullyFunded {
        total_raised: Amount,
        total_needed: Amount,
    },
}

impl AuditDetails {
    #[must_use]
    pub const fn action(&self) -> AuditAction {
        match self {
            Self::Submitted { .. } => AuditAction::Submitted,
            Self::Assigned { .. } => AuditAction::Assigned,
            Self::Reassigned { .. } => AuditAction::Reassigned,
            Self::Approved { .. } => AuditAction::Approved,
            Self::Rejected { .. } => AuditAction::Rejected,
            Self::Donated { .. } => AuditAction::Donated,
            Self::FullyFunded { .. } => AuditAction::FullyFunded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(flatten)]
    pub details: AuditDetails,
    pub performed_by: UserId,
    pub performed_by_role: Role,
    pub timestamp: Timestamp,
    pub notes: Option<String>,
}

impl AuditEntry {
    pub fn new(
        details: AuditDetails,
        performed_by: UserId,
        performed_by_role: Role,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            details,
            performed_by,
            performed_by_role,
            timestamp,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.details.action()
    }
}

/// Ordered, append-only audit history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog(Vec<AuditEntry>);

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`, clamping its timestamp so the log stays ordered.
    pub fn append(&mut self, mut entry: AuditEntry) -> &AuditEntry {
        if let Some(last) = self.0.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        self.0.push(entry);
        &self.0[self.0.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    #[must_use]
    pub fn latest(&self) -> Option<&AuditEntry> {
        self.0.last()
    }

    pub fn by_action(&self, action: AuditAction) -> impl Iterator<Item = &AuditEntry> + '_ {
        self.0.iter().filter(move |e| e.action() == action)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
