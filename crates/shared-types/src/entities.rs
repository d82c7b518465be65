//! # Core Entities
//!
//! Account identity shared between the lifecycle core and its collaborators.
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `Role`, `Principal`
//! - **Time & Money**: `Timestamp`, `Amount`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ParseRoleError;

/// Wall-clock instant, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Monetary amount in whole currency units.
///
/// Integer arithmetic keeps donation totals exact.
pub type Amount = u64;

// =============================================================================
// IDENTITY
// =============================================================================

/// Identifier of a platform account (family, donor, checker or admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds a deterministic identifier, used by fixtures.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account role as asserted by the token verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Family,
    Donor,
    Checker,
    Admin,
}

impl Role {
    /// Stable lowercase name, as stored in audit entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Donor => "donor",
            Self::Checker => "checker",
            Self::Admin => "admin",
        }
    }

    /// Checkers and admins may review cases.
    #[must_use]
    pub const fn can_review(self) -> bool {
        matches!(self, Self::Checker | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" => Ok(Self::Family),
            "donor" => Ok(Self::Donor),
            "checker" => Ok(Self::Checker),
            "admin" => Ok(Self::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// An authenticated caller.
///
/// Supplied by the token verifier before any lifecycle operation runs.
/// The core trusts `role` but still re-checks ownership and status-derived
/// permissions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn family(id: UserId) -> Self {
        Self::new(id, Role::Family)
    }

    #[must_use]
    pub const fn checker(id: UserId) -> Self {
        Self::new(id, Role::Checker)
    }

    #[must_use]
    pub const fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    #[must_use]
    pub const fn donor(id: UserId) -> Self {
        Self::new(id, Role::Donor)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
