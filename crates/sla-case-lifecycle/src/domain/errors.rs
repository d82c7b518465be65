//! Error types for the case lifecycle.
//!
//! Every operation either returns the updated case or exactly one
//! `LifecycleError`. Nothing is persisted when an error is returned.

use shared_types::{CaseId, CaseStatus, UserId};
use thiserror::Error;

/// Case lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Malformed or missing input
    #[error("Validation failed: {}", .violations.join("; "))]
    Validation { violations: Vec<String> },

    /// Operation is illegal for the case's current status
    #[error("Cannot {operation} case {case_id} while it is {status}")]
    InvalidState {
        case_id: CaseId,
        operation: &'static str,
        status: CaseStatus,
    },

    /// Submission attempted with required family data missing
    #[error("Submission incomplete, missing: {}", .missing.join(", "))]
    IncompleteSubmission { missing: Vec<String> },

    /// Approval without a valid damage percentage or cost estimate
    #[error("Approval requires: {}", .fields.join(", "))]
    MissingApprovalFields { fields: Vec<String> },

    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    /// Referenced checker is unknown, inactive or not a reviewer
    #[error("Checker not found or inactive: {0}")]
    CheckerNotFound(UserId),

    /// Actor lacks the role, ownership or assignment the operation needs
    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Case id already exists: {0}")]
    DuplicateCaseId(CaseId),

    /// Another writer saved the case since it was loaded
    #[error("Version conflict on {case_id}: expected {expected}, found {found}")]
    VersionConflict {
        case_id: CaseId,
        expected: u64,
        found: u64,
    },

    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

impl LifecycleError {
    pub(crate) fn validation(violation: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![violation.into()],
        }
    }

    pub(crate) fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::IncompleteSubmission { .. } => ErrorKind::IncompleteSubmission,
            Self::MissingApprovalFields { .. } => ErrorKind::MissingApprovalFields,
            Self::CaseNotFound(_) | Self::CheckerNotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::DuplicateCaseId(_) | Self::VersionConflict { .. } => ErrorKind::Conflict,
            Self::Storage { .. } => ErrorKind::Internal,
        }
    }
}

/// Coarse error category, stable across releases.
///
/// The HTTP boundary maps every client kind to a 4xx response and
/// `Internal` to a generic 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    IncompleteSubmission,
    MissingApprovalFields,
    NotFound,
    AccessDenied,
    Conflict,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvalidState => "invalid_state",
            Self::IncompleteSubmission => "incomplete_submission",
            Self::MissingApprovalFields => "missing_approval_fields",
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }

    #[must_use]
    pub const fn is_client_error(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
