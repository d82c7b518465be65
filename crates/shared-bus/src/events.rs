//! # Case Lifecycle Events
//!
//! Defines every event that flows through the shared bus. Each variant is
//! emitted exactly once per persisted transition.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, CaseId, Decision, Timestamp, UserId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseEvent {
    // =========================================================================
    // SUBMISSION
    // =========================================================================
    /// A family submitted its draft for review.
    CaseSubmitted {
        case_id: CaseId,
        owner: UserId,
        village: Option<String>,
        at: Timestamp,
    },

    /// A draft was deleted by its owner.
    DraftDeleted {
        case_id: CaseId,
        owner: UserId,
        at: Timestamp,
    },

    // =========================================================================
    // REVIEW
    // =========================================================================
    /// A checker was attached to a submitted case.
    CheckerAssigned {
        case_id: CaseId,
        checker_id: UserId,
        assigned_by: UserId,
        self_assigned: bool,
        at: Timestamp,
    },

    /// An under-review case was handed to a different checker.
    CheckerReassigned {
        case_id: CaseId,
        previous_checker: Option<UserId>,
        checker_id: UserId,
        assigned_by: UserId,
        at: Timestamp,
    },

    /// A checker approved or rejected a case.
    CaseDecided {
        case_id: CaseId,
        owner: UserId,
        decision: Decision,
        decided_by: UserId,
        estimated_cost: Option<Amount>,
        at: Timestamp,
    },

    // =========================================================================
    // FUNDING
    // =========================================================================
    /// The donation ledger credited an approved case.
    DonationRecorded {
        case_id: CaseId,
        donor: UserId,
        amount: Amount,
        total_raised: Amount,
        donation_progress: u8,
        at: Timestamp,
    },

    /// Donations reached the approved estimate; the case is closed.
    CaseFullyFunded {
        case_id: CaseId,
        owner: UserId,
        total_raised: Amount,
        at: Timestamp,
    },
}

impl CaseEvent {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::CaseSubmitted { .. } | Self::DraftDeleted { .. } => EventTopic::Submission,
            Self::CheckerAssigned { .. }
            | Self::CheckerReassigned { .. }
            | Self::CaseDecided { .. } => EventTopic::Review,
            Self::DonationRecorded { .. } | Self::CaseFullyFunded { .. } => EventTopic::Funding,
        }
    }

    /// The case every event is about.
    #[must_use]
    pub fn case_id(&self) -> &CaseId {
        match self {
            Self::CaseSubmitted { case_id, .. }
            | Self::DraftDeleted { case_id, .. }
            | Self::CheckerAssigned { case_id, .. }
            | Self::CheckerReassigned { case_id, .. }
            | Self::CaseDecided { case_id, .. }
            | Self::DonationRecorded { case_id, .. }
            | Self::CaseFullyFunded { case_id, .. } => case_id,
        }
    }

    /// Short stable name, used as a log field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CaseSubmitted { .. } => "case_submitted",
            Self::DraftDeleted { .. } => "draft_deleted",
            Self::CheckerAssigned { .. } => "checker_assigned",
            Self::CheckerReassigned { .. } => "checker_reassigned",
            Self::CaseDecided { .. } => "case_decided",
            Self::DonationRecorded { .. } => "donation_recorded",
            Self::CaseFullyFunded { .. } => "case_fully_funded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Submission,
    Review,
    Funding,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
    pub case_ids: Vec<CaseId>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            case_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn for_cases(case_ids: Vec<CaseId>) -> Self {
        Self {
            topics: Vec::new(),
            case_ids,
        }
    }

    #[must_use]
    pub fn matches(&self, event: &CaseEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let case_match = self.case_ids.is_empty() || self.case_ids.contains(event.case_id());

        topic_match && case_match
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    pub fn case_id(n: u32) -> CaseId {
        CaseId::parse(&format!("SLA-2025-{n:06}")).unwrap()
    }

    pub fn submitted(n: u32) -> CaseEvent {
        CaseEvent::CaseSubmitted {
            case_id: case_id(n),
            owner: UserId::from_u128(1),
            village: Some("Tyre".to_string()),
            at: at(),
        }
    }

    pub fn fully_funded(n: u32) -> CaseEvent {
        CaseEvent::CaseFullyFunded {
            case_id: case_id(n),
            owner: UserId::from_u128(1),
            total_raised: 5000,
            at: at(),
        }
    }
}
