//! Driving ports (Inbound API)
//!
//! Every operation takes the authenticated `Principal` first. Mutations
//! return the case as persisted; failures leave the stored case untouched.

use crate::domain::projections::{
    CheckerStats, FundingSummary, ImpactStats, KanbanBoard, PlatformStats, QueueItem,
    VillageSummary,
};
use crate::domain::{Case, DecisionInput, FamilyData, LifecycleResult, UploadedFile};
use crate::ports::CaseQuery;
use async_trait::async_trait;
use shared_types::{Amount, CaseId, CaseStatus, Principal, UserId};

/// Primary case lifecycle API.
#[async_trait]
pub trait CaseLifecycleApi: Send + Sync {
    // -------------------------------------------------------------------------
    // Family
    // -------------------------------------------------------------------------

    /// Create a draft owned by `actor`. Requires the identity fields.
    async fn create_draft(
        &self,
        actor: &Principal,
        family_data: FamilyData,
        files: Vec<UploadedFile>,
    ) -> LifecycleResult<Case>;

    /// Replace family data and/or files of a draft. `None` keeps the current value.
    async fn update_draft(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        family_data: Option<FamilyData>,
        files: Option<Vec<UploadedFile>>,
    ) -> LifecycleResult<Case>;

    async fn attach_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        file: UploadedFile,
    ) -> LifecycleResult<Case>;

    async fn remove_file(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checksum: &str,
    ) -> LifecycleResult<Case>;

    async fn delete_draft(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<()>;

    /// Submit a draft for review. Fails listing every missing required field.
    async fn submit(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case>;

    // -------------------------------------------------------------------------
    // Review
    // -------------------------------------------------------------------------

    async fn assign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case>;

    async fn reassign(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        checker_id: UserId,
        notes: Option<String>,
    ) -> LifecycleResult<Case>;

    async fn decide(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        input: DecisionInput,
    ) -> LifecycleResult<Case>;

    // -------------------------------------------------------------------------
    // Funding
    // -------------------------------------------------------------------------

    /// Credit a donation, then recompute progress (may close the case).
    async fn record_donation(
        &self,
        actor: &Principal,
        case_id: &CaseId,
        amount: Amount,
    ) -> LifecycleResult<Case>;

    /// Recompute progress after an external change to `total_raised`. Idempotent.
    async fn recompute_donation_progress(
        &self,
        actor: &Principal,
        case_id: &CaseId,
    ) -> LifecycleResult<Case>;

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    async fn get_case(&self, actor: &Principal, case_id: &CaseId) -> LifecycleResult<Case>;

    /// Cases matching `query` that `actor` is allowed to see.
    async fn list_cases(&self, actor: &Principal, query: &CaseQuery) -> LifecycleResult<Vec<Case>>;

    async fn review_queue(&self, actor: &Principal) -> LifecycleResult<Vec<QueueItem>>;

    async fn checker_stats(&self, actor: &Principal, checker_id: UserId)
        -> LifecycleResult<CheckerStats>;

    async fn village_summaries(&self, actor: &Principal) -> LifecycleResult<Vec<VillageSummary>>;

    async fn kanban(&self, actor: &Principal) -> LifecycleResult<KanbanBoard>;

    /// Public funding listing for `approved` or `fully_funded` cases.
    async fn funding_summary(&self, status: CaseStatus) -> LifecycleResult<FundingSummary>;

    async fn platform_stats(&self) -> LifecycleResult<PlatformStats>;

    async fn impact_stats(&self) -> LifecycleResult<ImpactStats>;
}
