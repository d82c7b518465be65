//! Domain layer for the case lifecycle
//!
//! Pure logic with no I/O:
//! - entities: the `Case` document and nested records
//! - lifecycle: status transitions and their guards
//! - audit: append-only action history
//! - validation: field, file and decision rules
//! - progress: donation progress formula
//! - projections: read-side views over many cases

mod audit;
mod config;
mod entities;
mod errors;
mod lifecycle;
mod progress;
pub mod projections;
pub mod validation;

pub use audit::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use lifecycle::*;
pub use progress::*;
