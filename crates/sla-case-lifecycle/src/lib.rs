//! # Case Lifecycle Manager
//!
//! Validates and applies every mutation to a family aid `Case` so that its
//! status, timestamps, derived fields and audit log stay consistent.
//!
//! ## State Machine
//!
//! ```text
//! [draft] ──submit──→ [submitted] ──assign──→ [under_review] ──decide(approved)──→ [approved]
//!                         │                      │  ↺ reassign                        │
//!                         ├──decide (self-assign)┤                        funding reaches 100%
//!                         │                      │                                    ↓
//!                         └──────decide(rejected)┴──→ [rejected]               [fully_funded]
//! ```
//!
//! `rejected` and `fully_funded` are terminal.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Transitions follow the table above | `domain/lifecycle.rs` - `allowed_transitions()` and per-operation status guards |
//! | Failed operations change nothing | `service/mod.rs` - `apply()` works on a copy, saves only on success |
//! | Status timestamps set once | `domain/lifecycle.rs` - `get_or_insert` on each timestamp |
//! | Audit log is append-only and ordered | `domain/audit.rs` - `AuditLog::append()` clamps timestamps |
//! | One audit entry per state change | `domain/lifecycle.rs` - `Case::audit()` |
//! | `donation_progress` = min(round(raised/needed×100), 100), 0 if needed = 0 | `domain/progress.rs` |
//! | Funding closure is idempotent | `domain/lifecycle.rs` - `apply_progress()` only promotes from `approved` |
//! | No lost updates | `ports/outbound.rs` - `CaseRepository::save` compare-and-swap on `version` |
//!
//! ## Architecture
//!
//! ```text
//!            ┌───────────────────────────────────────────┐
//! Principal  │  CaseLifecycleApi (ports/inbound)         │
//! ──────────→│    CaseLifecycleService (service)         │
//!            │      └─ domain: Case, lifecycle, audit,   │
//!            │         validation, projections           │
//!            └───────┬───────────┬───────────┬───────────┘
//!                    ↓           ↓           ↓
//!           CaseRepository  UserDirectory  NotificationSender
//!           (memory/rocksdb) (memory)      (shared-bus)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sla_case_lifecycle::{CaseLifecycleService, LifecycleDependencies, LifecycleConfig};
//! use sla_case_lifecycle::adapters::{BusNotificationSender, InMemoryCaseStore, SystemClock};
//!
//! let service = CaseLifecycleService::new(LifecycleDependencies {
//!     repository: Arc::new(InMemoryCaseStore::new()),
//!     users,
//!     notifier: Arc::new(BusNotificationSender::new(bus)),
//!     clock: Arc::new(SystemClock),
//!     metrics: telemetry.metrics(),
//!     config: LifecycleConfig::from_env(),
//! });
//!
//! let draft = service.create_draft(&family, family_data, files).await?;
//! let case = service.submit(&family, &draft.case_id).await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    AuditAction, AuditDetails, AuditEntry, AuditLog, Case, CheckerAssignment, CheckerDecision,
    DecisionInput, ErrorKind, FamilyData, FileCategory, LifecycleConfig, LifecycleError,
    LifecycleResult, Operation, UploadedFile,
};
pub use ports::{
    CaseLifecycleApi, CaseQuery, CaseRepository, Clock, NotificationSender, StoreError,
    UserDirectory, UserRecord,
};
pub use service::{CaseLifecycleService, LifecycleDependencies};
