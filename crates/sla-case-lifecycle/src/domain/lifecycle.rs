//! # Case State Machine
//!
//! Every mutation of a `Case` goes through one of the methods below. Each
//! method checks role, ownership and status first and only then touches the
//! case, so a failed call leaves the case exactly as it was.
//!
//! ```text
//! draft ──submit──→ submitted ──assign──→ under_review ──decide──→ approved ──funded──→ fully_funded
//!                       │                   │    ↺ reassign
//!                       └──decide───────────┴──decide(rejected)──→ rejected
//! ```
//!
//! Status timestamps (`submitted_at`, `review_started_at`, `approved_at`,
//! `fully_funded_at`) are set the first time their status is entered and
//! never overwritten.

use shared_types::{Amount, CaseId, CaseStatus, Decision, Principal, Role, Timestamp, UserId};

use super::audit::{AuditDetails, AuditEntry, AuditLog};
use super::config::LifecycleConfig;
use super::entities::{Case, CheckerAssignment, CheckerDecision, DecisionInput, FamilyData, UploadedFile};
use super::errors::{LifecycleError, LifecycleResult};
use super::progress::donation_progress;
use super::validation;

/// Notes recorded when a checker picks up an unassigned case by deciding it.
pub const SELF_ASSIGN_NOTES: &str = "Self-assigned during review";

/// Lifecycle operations, as named in errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDraft,
    UpdateDraft,
    AttachFile,
    RemoveFile,
    Submit,
    Assign,
    Reassign,
    Decide,
    RecordDonation,
    RecomputeProgress,
    DeleteDraft,
    View,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateDraft => "create_draft",
            Self::UpdateDraft => "update_draft",
            Self::AttachFile => "attach_file",
            Self::RemoveFile => "remove_file",
            Self::Submit => "submit",
            Self::Assign => "assign",
            Self::Reassign => "reassign",
            Self::Decide => "decide",
            Self::RecordDonation => "record_donation",
            Self::RecomputeProgress => "recompute_donation_progress",
            Self::DeleteDraft => "delete_draft",
            Self::View => "view",
        }
    }
}

/// Statuses reachable from `from` in one step.
///
/// `UnderReview → UnderReview` is the reassignment path.
#[must_use]
pub const fn allowed_transitions(from: CaseStatus) -> &'static [CaseStatus] {
    match from {
        CaseStatus::Draft => &[CaseStatus::Submitted],
        CaseStatus::Submitted => &[
            CaseStatus::UnderReview,
            CaseStatus::Approved,
            CaseStatus::Rejected,
        ],
        CaseStatus::UnderReview => &[
            CaseStatus::UnderReview,
            CaseStatus::Approved,
            CaseStatus::Rejected,
        ],
        CaseStatus::Approved => &[CaseStatus::FullyFunded],
        CaseStatus::Rejected | CaseStatus::FullyFunded => &[],
    }
}

#[must_use]
pub fn is_legal_transition(from: CaseStatus, to: CaseStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Whether `actor` may see `case` at all.
///
/// Families see their own cases, checkers see submitted work that is
/// unassigned or theirs, donors see fundable cases, admins see everything.
#[must_use]
pub fn can_view(case: &Case, actor: &Principal) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Family => case.is_owned_by(actor.id),
        Role::Checker => {
            case.status != CaseStatus::Draft && has_checker_access(case, actor)
        }
        Role::Donor => matches!(case.status, CaseStatus::Approved | CaseStatus::FullyFunded),
    }
}

/// Unassigned, or assigned to this checker. Admins always pass.
#[must_use]
pub fn has_checker_access(case: &Case, actor: &Principal) -> bool {
    actor.is_admin()
        || case
            .assigned_checker()
            .map_or(true, |checker| checker == actor.id)
}

impl Case {
    // =========================================================================
    // DRAFT
    // =========================================================================

    /// Creates a draft owned by `owner`.
    ///
    /// `case_id` is generated by the caller; uniqueness is the store's job.
    pub fn create_draft(
        case_id: CaseId,
        owner: &Principal,
        family_data: FamilyData,
        files: Vec<UploadedFile>,
        config: &LifecycleConfig,
        now: Timestamp,
    ) -> LifecycleResult<Self> {
        if owner.role != Role::Family {
            return Err(LifecycleError::access_denied(
                "only family accounts can create cases",
            ));
        }
        validation::validate_identity(&family_data)?;
        validation::validate_family_data(&family_data)?;
        validation::validate_files(&files, config)?;

        let form_completion = validation::form_completion(&family_data);
        Ok(Self {
            case_id,
            owner_id: owner.id,
            status: CaseStatus::Draft,
            family_data,
            uploaded_files: files,
            checker_assignment: None,
            checker_decision: None,
            audit_log: AuditLog::new(),
            total_needed: 0,
            total_raised: 0,
            donation_progress: 0,
            created_at: now,
            last_modified: now,
            submitted_at: None,
            review_started_at: None,
            approved_at: None,
            fully_funded_at: None,
            form_completion,
            version: 0,
        })
    }

    /// Replaces family data and/or the file set of a draft.
    pub fn update_draft(
        &mut self,
        actor: &Principal,
        family_data: Option<FamilyData>,
        files: Option<Vec<UploadedFile>>,
        config: &LifecycleConfig,
        now: Timestamp,
    ) -> LifecycleResult<()> {
        self.ensure_owner_draft(actor, Operation::UpdateDraft)?;
        if let Some(data) = &family_data {
            validation::validate_identity(data)?;
            validation::validate_family_data(data)?;
        }
        if let Some(files) = &files {
            validation::validate_files(files, config)?;
        }

        if let Some(data) = family_data {
            self.family_data = data;
        }
        if let Some(files) = files {
            self.uploaded_files = files;
        }
        self.form_completion = validation::form_completion(&self.family_data);
        self.touch(now);
        Ok(())
    }

    pub fn attach_file(
        &mut self,
        actor: &Principal,
        file: UploadedFile,
        config: &LifecycleConfig,
        now: Timestamp,
    ) -> LifecycleResult<()> {
        self.ensure_owner_draft(actor, Operation::AttachFile)?;
        validation::validate_file(&file, &self.uploaded_files, config)?;

        self.uploaded_files.push(file);
        self.touch(now);
        Ok(())
    }

    /// Removes the file with `checksum`, returning it.
    pub fn remove_file(
        &mut self,
        actor: &Principal,
        checksum: &str,
        now: Timestamp,
    ) -> LifecycleResult<UploadedFile> {
        self.ensure_owner_draft(actor, Operation::RemoveFile)?;
        let Some(index) = self
            .uploaded_files
            .iter()
            .position(|f| f.checksum.eq_ignore_ascii_case(checksum.trim()))
        else {
            return Err(LifecycleError::validation(format!(
                "no file with checksum {checksum} on case {}",
                self.case_id
            )));
        };

        let removed = self.uploaded_files.remove(index);
        self.touch(now);
        Ok(removed)
    }

    /// Guard for deleting a draft; deletion itself is a store operation.
    pub fn ensure_deletable(&self, actor: &Principal) -> LifecycleResult<()> {
        self.ensure_owner_draft(actor, Operation::DeleteDraft)
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    pub fn submit(&mut self, actor: &Principal, now: Timestamp) -> LifecycleResult<()> {
        self.ensure_owner_draft(actor, Operation::Submit)?;
        let missing = validation::missing_required_fields(&self.family_data);
        if !missing.is_empty() {
            return Err(LifecycleError::IncompleteSubmission { missing });
        }

        self.form_completion = validation::form_completion(&self.family_data);
        self.status = CaseStatus::Submitted;
        self.submitted_at.get_or_insert(now);
        self.audit(
            actor,
            AuditDetails::Submitted {
                form_completion: self.form_completion,
                file_count: self.uploaded_files.len(),
            },
            None,
            now,
        );
        self.touch(now);
        Ok(())
    }

    // =========================================================================
    // REVIEW
    // =========================================================================

    /// Guard for `assign`. Checker existence is verified by the caller.
    pub fn ensure_can_assign(&self, actor: &Principal, checker_id: UserId) -> LifecycleResult<()> {
        let allowed = actor.is_admin() || (actor.role == Role::Checker && actor.id == checker_id);
        if !allowed {
            return Err(LifecycleError::access_denied(
                "only admins can assign cases to other checkers",
            ));
        }
        self.ensure_status(Operation::Assign, &[CaseStatus::Submitted])
    }

    /// Attaches a checker to a submitted case and starts the review.
    pub fn assign(
        &mut self,
        actor: &Principal,
        checker_id: UserId,
        notes: Option<String>,
        now: Timestamp,
    ) -> LifecycleResult<()> {
        self.ensure_can_assign(actor, checker_id)?;

        let notes = clean_notes(notes);
        self.checker_assignment = Some(CheckerAssignment {
            checker_id,
            assigned_at: now,
            assigned_by: actor.id,
            notes: notes.clone(),
        });
        self.status = CaseStatus::UnderReview;
        self.review_started_at.get_or_insert(now);
        self.audit(actor, AuditDetails::Assigned { checker_id }, notes, now);
        self.touch(now);
        Ok(())
    }

    pub fn ensure_can_reassign(&self, actor: &Principal, checker_id: UserId) -> LifecycleResult<()> {
        if !actor.is_admin() {
            return Err(LifecycleError::access_denied("only admins can reassign cases"));
        }
        self.ensure_status(Operation::Reassign, &[CaseStatus::UnderReview])?;
        if self.assigned_checker() == Some(checker_id) {
            return Err(LifecycleError::validation(
                "case is already assigned to this checker",
            ));
        }
        Ok(())
    }

    /// Hands an under-review case to a different checker. Status is unchanged.
    pub fn reassign(
        &mut self,
        actor: &Principal,
        checker_id: UserId,
        notes: Option<String>,
        now: Timestamp,
    ) -> LifecycleResult<Option<UserId>> {
        self.ensure_can_reassign(actor, checker_id)?;

        let previous_checker = self.assigned_checker();
        let notes = clean_notes(notes);
        self.checker_assignment = Some(CheckerAssignment {
            checker_id,
            assigned_at: now,
            assigned_by: actor.id,
            notes: notes.clone(),
        });
        self.audit(
            actor,
            AuditDetails::Reassigned {
                previous_checker,
                checker_id,
            },
            notes,
            now,
        );
        self.touch(now);
        Ok(previous_checker)
    }

    /// Records a checker's verdict.
    ///
    /// An unassigned case is assigned to the decider first; that assignment
    /// is reported in the decision's audit entry rather than a separate one.
    /// Returns whether the case was self-assigned.
    pub fn decide(
        &mut self,
        actor: &Principal,
        input: &DecisionInput,
        config: &LifecycleConfig,
        now: Timestamp,
    ) -> LifecycleResult<bool> {
        if !actor.role.can_review() {
            return Err(LifecycleError::access_denied(
                "only checkers and admins can decide cases",
            ));
        }
        self.ensure_status(
            Operation::Decide,
            &[CaseStatus::Submitted, CaseStatus::UnderReview],
        )?;
        if !has_checker_access(self, actor) {
            return Err(LifecycleError::access_denied(
                "case is assigned to another checker",
            ));
        }
        let decision = validation::validate_decision(input, config)?;

        let self_assigned = self.checker_assignment.is_none();
        if self_assigned {
            self.checker_assignment = Some(CheckerAssignment {
                checker_id: actor.id,
                assigned_at: now,
                assigned_by: actor.id,
                notes: Some(SELF_ASSIGN_NOTES.to_string()),
            });
        }

        let details = match decision.decision {
            Decision::Approved => {
                // Both present on a validated approval.
                let cost = decision.estimated_cost.unwrap_or_default();
                let pct = decision.final_damage_percentage.unwrap_or_default();
                self.total_needed = cost;
                self.approved_at.get_or_insert(now);
                self.donation_progress = donation_progress(self.total_raised, self.total_needed);
                AuditDetails::Approved {
                    final_damage_percentage: pct,
                    estimated_cost: cost,
                    field_notes: decision.field_notes.clone(),
                    self_assigned,
                }
            }
            Decision::Rejected => AuditDetails::Rejected {
                field_notes: decision.field_notes.clone(),
                self_assigned,
            },
        };

        self.checker_decision = Some(CheckerDecision {
            checker_id: actor.id,
            decision: decision.decision,
            comments: decision.comments.clone(),
            final_damage_percentage: decision.final_damage_percentage,
            estimated_cost: decision.estimated_cost,
            field_notes: decision.field_notes,
            decided_at: now,
        });
        self.status = decision.decision.resulting_status();
        self.audit(actor, details, Some(decision.comments), now);
        self.touch(now);
        Ok(self_assigned)
    }

    // =========================================================================
    // FUNDING
    // =========================================================================

    /// Credits a donation and recomputes progress.
    ///
    /// Returns whether the donation completed the funding.
    pub fn record_donation(
        &mut self,
        actor: &Principal,
        amount: Amount,
        config: &LifecycleConfig,
        now: Timestamp,
    ) -> LifecycleResult<bool> {
        if !matches!(actor.role, Role::Donor | Role::Admin) {
            return Err(LifecycleError::access_denied(
                "only donors and admins can record donations",
            ));
        }
        self.ensure_status(Operation::RecordDonation, &[CaseStatus::Approved])?;
        if amount == 0 || amount > config.max_donation_amount {
            return Err(LifecycleError::validation(format!(
                "donation amount must be between 1 and {}",
                config.max_donation_amount
            )));
        }
        let Some(total_raised) = self.total_raised.checked_add(amount) else {
            return Err(LifecycleError::validation("donation total overflows"));
        };

        self.total_raised = total_raised;
        self.audit(
            actor,
            AuditDetails::Donated {
                amount,
                total_raised,
            },
            None,
            now,
        );
        let funded = self.apply_progress(actor, now);
        self.touch(now);
        Ok(funded)
    }

    /// Recomputes `donation_progress` after `total_raised` changed.
    ///
    /// Promotes an approved case to `fully_funded` once progress reaches 100.
    /// Idempotent: on an already funded case it changes nothing. Returns
    /// whether this call performed the promotion.
    pub fn recompute_donation_progress(
        &mut self,
        actor: &Principal,
        now: Timestamp,
    ) -> LifecycleResult<bool> {
        if !matches!(actor.role, Role::Donor | Role::Admin) {
            return Err(LifecycleError::access_denied(
                "only donors and admins can update donation progress",
            ));
        }
        let before = (self.donation_progress, self.status);
        let funded = self.apply_progress(actor, now);
        if (self.donation_progress, self.status) != before {
            self.touch(now);
        }
        Ok(funded)
    }

    fn apply_progress(&mut self, actor: &Principal, now: Timestamp) -> bool {
        if self.total_needed == 0 {
            return false;
        }
        self.donation_progress = donation_progress(self.total_raised, self.total_needed);

        if self.donation_progress >= 100 && self.status == CaseStatus::Approved {
            self.status = CaseStatus::FullyFunded;
            self.fully_funded_at.get_or_insert(now);
            self.audit(
                actor,
                AuditDetails::FullyFunded {
                    total_raised: self.total_raised,
                    total_needed: self.total_needed,
                },
                None,
                now,
            );
            return true;
        }
        false
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn ensure_owner_draft(&self, actor: &Principal, operation: Operation) -> LifecycleResult<()> {
        if actor.role != Role::Family || !self.is_owned_by(actor.id) {
            return Err(LifecycleError::access_denied(format!(
                "only the owning family can {} this case",
                operation.as_str().replace('_', " ")
            )));
        }
        self.ensure_status(operation, &[CaseStatus::Draft])
    }

    fn ensure_status(&self, operation: Operation, allowed: &[CaseStatus]) -> LifecycleResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                case_id: self.case_id.clone(),
                operation: operation.as_str(),
                status: self.status,
            })
        }
    }

    /// The single append point for audit entries.
    fn audit(
        &mut self,
        actor: &Principal,
        details: AuditDetails,
        notes: Option<String>,
        now: Timestamp,
    ) {
        self.audit_log
            .append(AuditEntry::new(details, actor.id, actor.role, now).with_notes(notes));
    }

    fn touch(&mut self, now: Timestamp) {
        if now > self.last_modified {
            self.last_modified = now;
        }
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
