//! Case Lifecycle Service - Core business logic
//!
//! # Architecture
//! - Every mutation is load → apply on a copy → compare-and-swap save
//! - Events are sent only after the save succeeds
//! - Notification failures are logged and never undo a transition
//! - Metrics are injected per instance, never global

use crate::domain::projections::{
    self, CheckerStats, FundingSummary, ImpactStats, KanbanBoard, PlatformStats, QueueItem,
    VillageSummary,
};
use crate::domain::{
    can_view, Case, DecisionInput, FamilyData, LifecycleConfig, LifecycleError, LifecycleResult,
    Operation, UploadedFile,
};
use crate::ports::{
    CaseLifecycleApi, CaseQuery, CaseRepository, Clock, NotificationSender, UserDirectory,
};
use async_trait::async_trait;
use shared_bus::CaseEvent;
use shared_types::{Amount, CaseId, CaseStatus, Principal, Role, Timestamp, UserId};
use sla_telemetry::{LifecycleMetrics, OperationTimer};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Case Lifecycle Service
pub struct CaseLifecycleService<R, U, N>
where
    R: CaseRepository,
    U: UserDirectory,
    N: NotificationSender,
{
    repository: Arc<R>,
    users: Arc<U>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LifecycleMetrics>,
    config: LifecycleConfig,
}

/// Dependencies for CaseLifecycleService
pub struct LifecycleDependencies<R, U, N> {
    pub repository: Arc<R>,
    pub users: Arc<U>,
    pub notifier: Arc<N>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<LifecycleMetrics>,
    pub config: LifecycleConfig,
}

/// A saved case plus whatever the domain operation returned.
struct Applied<T> {
    case: Case,
    value: T,
}

impl<R, U, N> CaseLifecycleService<R, U, N>
where
    R: CaseRepository,
    U: UserDirectory,
    N: NotificationSender,
{
    pub fn new(deps: LifecycleDependencies<R, U, N>) -> Self {
        Self {
            repository: deps.repository,
            users: deps.users,
            notifier: deps.notifier,
            clock: deps.clock,
            metrics: deps.metrics,
            config: deps.config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<LifecycleMetrics> {
        &self.metrics
    }

    // === PLUMBING ===

    async fn load_case(&self, case_id: &CaseId) -> LifecycleResult<Case> {
        self.repository
            .load(case_id)
            .await?
            .ok_or_else(|| LifecycleError::CaseNotFound(case_id.clone()))
    }

    /// Applies `op` to `case` and saves it against the loaded version.
    ///
    /// On error nothing is written.
    async fn apply<T, F>(&self, mut case: Case, op: F) -> LifecycleResult<Applied<T>>
    where
        F: FnOnce(&mut Case, Timestamp) -> LifecycleResult<T> + Send,
    {
        let expected_version = case.version;
        let audit_before = case.audit_log.len();
        let value = op(&mut case, self.clock.now())?;
        let case = self.repository.save(case, expected_version).await?;
        self.record_transitions(&case, audit_before);
        Ok(Applied { case, value })
    }

    fn record_transitions(&self, case: &Case, audit_before: usize) {
        for entry in &case.audit_log.entries()[audit_before..] {
            self.metrics.record_transition(entry.action().as_str());
        }
    }

    async fn notify(&self, event: CaseEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(
                event = event.name(),
                case_id = %event.case_id(),
                error = %e,
                "Notification failed; transition kept"
            );
        }
    }

    /// Records the outcome of one API call.
    fn finish<T>(
        &self,
        operation: Operation,
        actor: &Principal,
        timer: OperationTimer,
        result: LifecycleResult<T>,
    ) -> LifecycleResult<T> {
        timer.observe();
        self.metrics.record_operation(operation.as_str());
        if let Err(e) = &result {
            let kind = e.kind();
            self.metrics.record_rejection(kind.as_str());
            if kind.is_client_error() {
                warn!(
                    operation = operation.as_str(),
                    actor = %actor.id,
                    role = %actor.role,
                    kind = kind.as_str(),
                    error = %e,
                    "Lifecycle operation rejected"
                );
            } else {
                error!(
                    operation = operation.as_str(),
                    actor = %actor.id,
                    error = %e,
                    "Lifecycle operation failed"
                );
            }
        }
        result
    }

    /// The target must be an active checker or admin.
    async fn ensure_reviewer(&self, checker_id: UserId) -> LifecycleResult<()> {
        match self.users.find_user(checker_id).await {
            Some(user) if user.is_active && user.role.can_review() => Ok(()),
            _ => Err(LifecycleError::CheckerNotFound(checker_id)),
        }
    }

    fn ensure_role(actor: &Principal, allowed: &[Role], what: &str) -> LifecycleResult<()> {
        if allowed.contains(&actor.role) {
            Ok(())
        } else {
            Err(LifecycleError::AccessDenied {
                reason: format!("{} accounts cannot view {what}", actor.role),
            })
        }
    }

    // === OPERATIONS ===

    async fn do_create_draft(
        &self,
        actor: &Principal,
        family_data: FamilyData,
        files: Vec<UploadedFile>,
    ) -> LifecycleResult<Case> {
        let now = self.clock.now();
        let case_id = CaseId::generate(&self.config.case_id_prefix, now);
        let case = Case::create_draft(case_id, actor, family_data, files, &self.config, now)?;
        let case = self.repository.insert(case).await?;

        info!(
            case_id = %case.case_id,
            actor = %actor.id,
            form_completion = case.form_completion,
            "Draft created"
        );
        Ok(case)
    }

    async fn do_update_draft(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        family_data: Option<FamilyData>,
        files: Option<Vec<UploadedFile>>,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        let applied = self
            .apply(case, |case, now| {
                case.update_draft(actor, family_data, files, &self.config, now)
            })
            .await?;

        info!(
            case_id = %case_id,
            actor = %actor.id,
            form_completion = applied.case.form_completion,
            "Draft updated"
        );
        Ok(applied.case)
    }

    async fn do_attach_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        file: UploadedFile,
    ) -> LifecycleResult<Case> {
        let checksum = file.checksum.clone();
        let case = self.load_case(case_id).await?;
        let applied = self
            .apply(case, |case, now| case.attach_file(actor, file, &self.config, now))
            .await?;

        info!(
            case_id = %case_id,
            checksum = %checksum,
            files = applied.case.uploaded_files.len(),
            "File attached"
        );
        Ok(applied.case)
    }

    async fn do_remove_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checksum: &str,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        let applied = self
            .apply(case, |case, now| case.remove_file(actor, checksum, now))
            .await?;

        info!(
            case_id = %case_id,
            file = %applied.value.original_name,
            "File removed"
        );
        Ok(applied.case)
    }

    async fn do_delete_draft(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<()> {
        let case = self.load_case(case_id).await?;
        case.ensure_deletable(actor)?;
        self.repository.delete(case_id, case.version).await?;

        info!(case_id = %case_id, actor = %actor.id, "Draft deleted");
        self.notify(CaseEvent::DraftDeleted {
            case_id: case_id.clone(),
            owner: case.owner_id,
            at: self.clock.now(),
        })
        .await;
        Ok(())
    }

    async fn do_submit(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        let applied = self.apply(case, |case, now| case.submit(actor, now)).await?;
        let case = applied.case;

        info!(
            case_id = %case.case_id,
            status = %case.status,
            actor = %actor.id,
            files = case.uploaded_files.len(),
            "Case submitted"
        );
        self.notify(CaseEvent::CaseSubmitted {
            case_id: case.case_id.clone(),
            owner: case.owner_id,
            village: case.family_data.village.clone(),
            at: case.submitted_at.unwrap_or(case.last_modified),
        })
        .await;
        Ok(case)
    }

    async fn do_assign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        case.ensure_can_assign(actor, checker_id)?;
        self.ensure_reviewer(checker_id).await?;

        let applied = self
            .apply(case, |case, now| case.assign(actor, checker_id, notes, now))
            .await?;
        let case = applied.case;

        info!(
            case_id = %case.case_id,
            status = %case.status,
            actor = %actor.id,
            checker = %checker_id,
            "Checker assigned"
        );
        self.notify(CaseEvent::CheckerAssigned {
            case_id: case.case_id.clone(),
            checker_id,
            assigned_by: actor.id,
            self_assigned: actor.id == checker_id,
            at: case.last_modified,
        })
        .await;
        Ok(case)
    }

    async fn do_reassign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        case.ensure_can_reassign(actor, checker_id)?;
        self.ensure_reviewer(checker_id).await?;

        let applied = self
            .apply(case, |case, now| case.reassign(actor, checker_id, notes, now))
            .await?;
        let case = applied.case;

        info!(
            case_id = %case.case_id,
            actor = %actor.id,
            checker = %checker_id,
            previous = ?applied.value,
            "Case reassigned"
        );
        self.notify(CaseEvent::CheckerReassigned {
            case_id: case.case_id.clone(),
            previous_checker: applied.value,
            checker_id,
            assigned_by: actor.id,
            at: case.last_modified,
        })
        .await;
        Ok(case)
    }

    async fn do_decide(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        input: DecisionInput,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        let applied = self
            .apply(case, |case, now| case.decide(actor, &input, &self.config, now))
            .await?;
        let self_assigned = applied.value;
        let case = applied.case;

        info!(
            case_id = %case.case_id,
            status = %case.status,
            actor = %actor.id,
            self_assigned,
            total_needed = case.total_needed,
            "Case decided"
        );
        if self_assigned {
            self.notify(CaseEvent::CheckerAssigned {
                case_id: case.case_id.clone(),
                checker_id: actor.id,
                assigned_by: actor.id,
                self_assigned: true,
                at: case.last_modified,
            })
            .await;
        }
        self.notify(CaseEvent::CaseDecided {
            case_id: case.case_id.clone(),
            owner: case.owner_id,
            decision: input.decision,
            decided_by: actor.id,
            estimated_cost: case.checker_decision.as_ref().and_then(|d| d.estimated_cost),
            at: case.last_modified,
        })
        .await;
        Ok(case)
    }

    async fn do_record_donation(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        amount: Amount,
    ) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        let applied = self
            .apply(case, |case, now| {
                case.record_donation(actor, amount, &self.config, now)
            })
            .await?;
        let funded = applied.value;
        let case = applied.case;
        self.metrics.record_donation(amount);

        info!(
            case_id = %case.case_id,
            status = %case.status,
            actor = %actor.id,
            amount,
            total_raised = case.total_raised,
            progress = case.donation_progress,
            "Donation recorded"
        );
        self.notify(CaseEvent::DonationRecorded {
            case_id: case.case_id.clone(),
            donor: actor.id,
            amount,
            total_raised: case.total_raised,
            donation_progress: case.donation_progress,
            at: case.last_modified,
        })
        .await;
        if funded {
            self.notify_funded(&case).await;
        }
        Ok(case)
    }

    async fn do_recompute(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;

        let mut next = case.clone();
        let funded = next.recompute_donation_progress(actor, self.clock.now())?;
        if next == case {
            debug!(case_id = %case_id, progress = case.donation_progress, "Donation progress unchanged");
            return Ok(case);
        }

        let audit_before = case.audit_log.len();
        let case = self.repository.save(next, case.version).await?;
        self.record_transitions(&case, audit_before);
        info!(
            case_id = %case.case_id,
            status = %case.status,
            progress = case.donation_progress,
            "Donation progress recomputed"
        );
        if funded {
            self.notify_funded(&case).await;
        }
        Ok(case)
    }

    async fn notify_funded(&self, case: &Case) {
        info!(
            case_id = %case.case_id,
            total_raised = case.total_raised,
            total_needed = case.total_needed,
            "Case fully funded"
        );
        self.notify(CaseEvent::CaseFullyFunded {
            case_id: case.case_id.clone(),
            owner: case.owner_id,
            total_raised: case.total_raised,
            at: case.fully_funded_at.unwrap_or(case.last_modified),
        })
        .await;
    }

    // === READS ===

    async fn do_get_case(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case> {
        let case = self.load_case(case_id).await?;
        if !can_view(&case, actor) {
            return Err(LifecycleError::AccessDenied {
                reason: format!("case {case_id} is not visible to this account"),
            });
        }
        debug!(case_id = %case_id, actor = %actor.id, "Case read");
        Ok(case)
    }

    async fn do_list_cases(&self, actor: &Principal, query: &CaseQuery) -> LifecycleResult<Vec<Case>> {
        let mut query = query.clone();
        if actor.role == Role::Family {
            query.owner = Some(actor.id);
        }
        let cases: Vec<Case> = self
            .repository
            .find(&query)
            .await?
            .into_iter()
            .filter(|case| can_view(case, actor))
            .collect();
        debug!(actor = %actor.id, count = cases.len(), "Cases listed");
        Ok(cases)
    }

    async fn do_review_queue(&self, actor: &Principal) -> LifecycleResult<Vec<QueueItem>> {
        Self::ensure_role(actor, &[Role::Checker, Role::Admin], "the review queue")?;
        let cases = self
            .repository
            .find(&CaseQuery::with_status([
                CaseStatus::Submitted,
                CaseStatus::UnderReview,
            ]))
            .await?;
        Ok(projections::review_queue(
            &cases,
            actor.id,
            self.clock.now(),
            self.config.review_queue_limit,
        ))
    }

    async fn do_checker_stats(
        &self,
        actor: &Principal,
        checker_id: UserId,
    ) -> LifecycleResult<CheckerStats> {
        let own = actor.role == Role::Checker && actor.id == checker_id;
        if !own && !actor.is_admin() {
            return Err(LifecycleError::AccessDenied {
                reason: "checker statistics are visible to the checker and admins only".into(),
            });
        }
        let cases = self.repository.find(&CaseQuery::all()).await?;
        Ok(projections::checker_stats(&cases, checker_id))
    }

    async fn do_village_summaries(&self, actor: &Principal) -> LifecycleResult<Vec<VillageSummary>> {
        Self::ensure_role(actor, &[Role::Admin], "village summaries")?;
        let cases = self.repository.find(&CaseQuery::all()).await?;
        Ok(projections::village_summaries(&cases))
    }

    async fn do_kanban(&self, actor: &Principal) -> LifecycleResult<KanbanBoard> {
        Self::ensure_role(actor, &[Role::Admin], "the kanban board")?;
        let cases = self
            .repository
            .find(&CaseQuery::with_status([
                CaseStatus::Submitted,
                CaseStatus::UnderReview,
                CaseStatus::Approved,
            ]))
            .await?;
        Ok(projections::kanban(&cases))
    }

    async fn all_cases_refreshing_gauges(&self) -> LifecycleResult<Vec<Case>> {
        let cases = self.repository.find(&CaseQuery::all()).await?;
        for status in CaseStatus::ALL {
            let count = cases.iter().filter(|c| c.status == status).count();
            self.metrics.set_cases_in_status(status.as_str(), count);
        }
        Ok(cases)
    }
}

#[async_trait]
impl<R, U, N> CaseLifecycleApi for CaseLifecycleService<R, U, N>
where
    R: CaseRepository,
    U: UserDirectory,
    N: NotificationSender,
{
    async fn create_draft(
        &self,
        actor: &Principal,
        family_data: FamilyData,
        files: Vec<UploadedFile>,
    ) -> LifecycleResult<Case> {
        let op = Operation::CreateDraft;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_create_draft(actor, family_data, files).await;
        self.finish(op, actor, timer, result)
    }

    async fn update_draft(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        family_data: Option<FamilyData>,
        files: Option<Vec<UploadedFile>>,
    ) -> LifecycleResult<Case> {
        let op = Operation::UpdateDraft;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_update_draft(actor, case_id, family_data, files).await;
        self.finish(op, actor, timer, result)
    }

    async fn attach_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        file: UploadedFile,
    ) -> LifecycleResult<Case> {
        let op = Operation::AttachFile;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_attach_file(actor, case_id, file).await;
        self.finish(op, actor, timer, result)
    }

    async fn remove_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checksum: &str,
    ) -> LifecycleResult<Case> {
        let op = Operation::RemoveFile;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_remove_file(actor, case_id, checksum).await;
        self.finish(op, actor, timer, result)
    }

    async fn delete_draft(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<()> {
        let op = Operation::DeleteDraft;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_delete_draft(actor, case_id).await;
        self.finish(op, actor, timer, result)
    }

    async fn submit(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case> {
        let op = Operation::Submit;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_submit(actor, case_id).await;
        self.finish(op, actor, timer, result)
    }

    async fn assign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case> {
        let op = Operation::Assign;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_assign(actor, case_id, checker_id, notes).await;
        self.finish(op, actor, timer, result)
    }

    async fn reassign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case> {
        let op = Operation::Reassign;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_reassign(actor, case_id, checker_id, notes).await;
        self.finish(op, actor, timer, result)
    }

    async fn decide(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        input: DecisionInput,
    ) -> LifecycleResult<Case> {
        let op = Operation::Decide;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_decide(actor, case_id, input).await;
        self.finish(op, actor, timer, result)
    }

    async fn record_donation(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        amount: Amount,
    ) -> LifecycleResult<Case> {
        let op = Operation::RecordDonation;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_record_donation(actor, case_id, amount).await;
        self.finish(op, actor, timer, result)
    }

    async fn recompute_donation_progress(
        &self,
        actor: &Principal,
        case_id: &CaseId,
    ) -> LifecycleResult<Case> {
        let op = Operation::RecomputeProgress;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_recompute(actor, case_id).await;
        self.finish(op, actor, timer, result)
    }

    async fn get_case(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_get_case(actor, case_id).await;
        self.finish(op, actor, timer, result)
    }

    async fn list_cases(&self, actor: &Principal, query: &CaseQuery) -> LifecycleResult<Vec<Case>> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_list_cases(actor, query).await;
        self.finish(op, actor, timer, result)
    }

    async fn review_queue(&self, actor: &Principal) -> LifecycleResult<Vec<QueueItem>> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_review_queue(actor).await;
        self.finish(op, actor, timer, result)
    }

    async fn checker_stats(
        &self,
        actor: &Principal,
        checker_id: UserId,
    ) -> LifecycleResult<CheckerStats> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_checker_stats(actor, checker_id).await;
        self.finish(op, actor, timer, result)
    }

    async fn village_summaries(&self, actor: &Principal) -> LifecycleResult<Vec<VillageSummary>> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_village_summaries(actor).await;
        self.finish(op, actor, timer, result)
    }

    async fn kanban(&self, actor: &Principal) -> LifecycleResult<KanbanBoard> {
        let op = Operation::View;
        let timer = self.metrics.start_timer(op.as_str());
        let result = self.do_kanban(actor).await;
        self.finish(op, actor, timer, result)
    }

    async fn funding_summary(&self, status: CaseStatus) -> LifecycleResult<FundingSummary> {
        let cases = self
            .repository
            .find(&CaseQuery::with_status([status]))
            .await?;
        Ok(projections::funding_summary(&cases, status))
    }

    async fn platform_stats(&self) -> LifecycleResult<PlatformStats> {
        let cases = self.all_cases_refreshing_gauges().await?;
        Ok(projections::platform_stats(&cases))
    }

    async fn impact_stats(&self) -> LifecycleResult<ImpactStats> {
        let cases = self.all_cases_refreshing_gauges().await?;
        Ok(projections::impact_stats(&cases))
    }
}

#[cfg(test)]
mod tests;
