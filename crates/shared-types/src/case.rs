//! # Case Identity and Status
//!
//! The parts of a case that travel outside the lifecycle core: its
//! human-readable identifier, its status and the checker's verdict. Event
//! payloads and read-side consumers use these without depending on the
//! lifecycle crate.

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::entities::Timestamp;
use crate::errors::{ParseCaseIdError, ParseStatusError};

/// Prefix used when no deployment-specific prefix is configured.
pub const DEFAULT_CASE_ID_PREFIX: &str = "SLA";

/// Number of trailing epoch-millisecond digits embedded in a case id.
const CASE_ID_SEQUENCE_DIGITS: usize = 6;

// =============================================================================
// CASE ID
// =============================================================================

/// Human-readable, globally unique case identifier: `<PREFIX>-<year>-<6 digits>`.
///
/// Generated once at creation from the creation instant. Collisions inside the
/// same millisecond modulo 10^6 are possible; the store's unique index rejects
/// them and the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    /// Generates the id for a case created at `now`.
    #[must_use]
    pub fn generate(prefix: &str, now: Timestamp) -> Self {
        let sequence = now.timestamp_millis().rem_euclid(1_000_000);
        Self(format!(
            "{prefix}-{}-{sequence:0width$}",
            now.year(),
            width = CASE_ID_SEQUENCE_DIGITS
        ))
    }

    /// Parses and validates an externally supplied id.
    pub fn parse(raw: &str) -> Result<Self, ParseCaseIdError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.rsplitn(3, '-');
        let (Some(sequence), Some(year), Some(prefix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseCaseIdError(raw.to_string()));
        };

        let prefix_ok = !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric());
        let year_ok = year.len() == 4 && year.chars().all(|c| c.is_ascii_digit());
        let sequence_ok = sequence.len() == CASE_ID_SEQUENCE_DIGITS
            && sequence.chars().all(|c| c.is_ascii_digit());

        if prefix_ok && year_ok && sequence_ok {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ParseCaseIdError(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CaseId {
    type Err = ParseCaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CaseId {
    type Error = ParseCaseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.0
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Position of a case in its lifecycle.
///
/// ```text
/// draft ──submit──→ submitted ──assign──→ under_review ──decide──→ approved ──funded──→ fully_funded
///                       │                      │
///                       └──────decide──────────┴──decide(rejected)──→ rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    FullyFunded,
}

impl CaseStatus {
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Submitted,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::FullyFunded,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::FullyFunded => "fully_funded",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::FullyFunded)
    }

    /// Awaiting a checker verdict.
    #[must_use]
    pub const fn is_pending_review(self) -> bool {
        matches!(self, Self::Submitted | Self::UnderReview)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A checker's verdict on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Status a case enters when this verdict is applied.
    #[must_use]
    pub const fn resulting_status(self) -> CaseStatus {
        match self {
            Self::Approved => CaseStatus::Approved,
            Self::Rejected => CaseStatus::Rejected,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
