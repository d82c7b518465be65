//! Driven ports (Outbound dependencies)
//!
//! What the lifecycle service needs from the outside world: a case store
//! with compare-and-swap saves, a user directory, a notification channel
//! and a clock.

use crate::domain::{Case, LifecycleError};
use async_trait::async_trait;
use shared_bus::CaseEvent;
use shared_types::{CaseId, CaseStatus, Role, Timestamp, UserId};
use thiserror::Error;

// =============================================================================
// CASE STORE
// =============================================================================

/// Failures reported by a `CaseRepository`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("case {0} already exists")]
    Duplicate(CaseId),

    #[error("case {case_id} changed concurrently: expected version {expected}, found {found}")]
    Conflict {
        case_id: CaseId,
        expected: u64,
        found: u64,
    },

    #[error("case {0} not found")]
    NotFound(CaseId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => Self::DuplicateCaseId(id),
            StoreError::Conflict {
                case_id,
                expected,
                found,
            } => Self::VersionConflict {
                case_id,
                expected,
                found,
            },
            StoreError::NotFound(id) => Self::CaseNotFound(id),
            StoreError::Backend(reason) => Self::Storage { reason },
        }
    }
}

/// Secondary lookup over stored cases. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseQuery {
    pub owner: Option<UserId>,
    pub statuses: Vec<CaseStatus>,
    /// Compared case-insensitively after trimming.
    pub village: Option<String>,
    pub assigned_checker: Option<UserId>,
    pub unassigned_only: bool,
}

impl CaseQuery {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(statuses: impl IntoIterator<Item = CaseStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_village(mut self, village: impl Into<String>) -> Self {
        self.village = Some(village.into());
        self
    }

    #[must_use]
    pub fn assigned_to(mut self, checker: UserId) -> Self {
        self.assigned_checker = Some(checker);
        self
    }

    #[must_use]
    pub fn unassigned(mut self) -> Self {
        self.unassigned_only = true;
        self
    }

    #[must_use]
    pub fn matches(&self, case: &Case) -> bool {
        if self.owner.is_some_and(|owner| owner != case.owner_id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&case.status) {
            return false;
        }
        if let Some(village) = &self.village {
            let wanted = village.trim().to_lowercase();
            if case.family_data.village_key().as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if self
            .assigned_checker
            .is_some_and(|checker| case.assigned_checker() != Some(checker))
        {
            return false;
        }
        !(self.unassigned_only && case.checker_assignment.is_some())
    }
}

/// Durable case storage.
///
/// `save` and `delete` are compare-and-swap on `Case::version`: they succeed
/// only if the stored version equals `expected_version`, and `save` returns
/// the case as stored, with its version bumped.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Inserts a new case. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, case: Case) -> Result<Case, StoreError>;

    async fn load(&self, case_id: &CaseId) -> Result<Option<Case>, StoreError>;

    async fn save(&self, case: Case, expected_version: u64) -> Result<Case, StoreError>;

    async fn delete(&self, case_id: &CaseId, expected_version: u64) -> Result<(), StoreError>;

    /// Cases matching `query`, ordered by case id.
    async fn find(&self, query: &CaseQuery) -> Result<Vec<Case>, StoreError>;
}

// =============================================================================
// USERS
// =============================================================================

/// What the lifecycle needs to know about an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub role: Role,
    pub is_active: bool,
    pub display_name: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Option<UserRecord>;
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

/// Outgoing notifications for persisted transitions.
///
/// Failures are logged by the caller and never undo the transition.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(&self, event: &CaseEvent) -> Result<(), NotificationError>;
}

// =============================================================================
// TIME
// =============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
