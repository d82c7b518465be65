//! # Shared Types Crate
//!
//! Identity, role and money primitives used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: account identity and roles are defined here,
//!   never re-declared by a subsystem.
//! - **Authenticated Principal Only**: lifecycle operations receive a
//!   [`Principal`] produced by the token verifier; payloads never carry a
//!   second, caller-supplied identity.

pub mod case;
pub mod entities;
pub mod errors;

pub use case::*;
pub use entities::*;
pub use errors::*;
