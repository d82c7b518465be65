//! # Error Types
//!
//! Errors raised while decoding shared primitives.

use thiserror::Error;

/// A role string did not name one of the four account roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(pub String);

/// A case id did not match `<PREFIX>-<year>-<6 digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed case id: {0:?}")]
pub struct ParseCaseIdError(pub String);

/// A status string did not name a lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown case status: {0}")]
pub struct ParseStatusError(pub String);
