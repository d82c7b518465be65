use super::*;
use crate::adapters::{InMemoryCaseStore, InMemoryUserDirectory, ManualClock};
use crate::domain::validation::fixtures::{complete_family_data, identity_only};
use crate::domain::{AuditAction, FileCategory};
use crate::ports::NotificationError;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;

const FAMILY: UserId = UserId::from_u128(0xF1);
const OTHER_FAMILY: UserId = UserId::from_u128(0xF2);
const CHECKER: UserId = UserId::from_u128(0xC1);
const OTHER_CHECKER: UserId = UserId::from_u128(0xC2);
const RETIRED_CHECKER: UserId = UserId::from_u128(0xC3);
const ADMIN: UserId = UserId::from_u128(0xA1);
const DONOR: UserId = UserId::from_u128(0xD1);

// Mock implementations for testing
#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<CaseEvent>>,
}

impl RecordingNotifier {
    fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(CaseEvent::name).collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn notify(&self, event: &CaseEvent) -> Result<(), NotificationError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn notify(&self, _event: &CaseEvent) -> Result<(), NotificationError> {
        Err(NotificationError("smtp unreachable".into()))
    }
}

struct Harness<N: NotificationSender> {
    store: Arc<InMemoryCaseStore>,
    notifier: Arc<N>,
    clock: Arc<ManualClock>,
    service: CaseLifecycleService<InMemoryCaseStore, InMemoryUserDirectory, N>,
}

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap()
}

fn harness_with<N: NotificationSender>(notifier: N) -> Harness<N> {
    let store = Arc::new(InMemoryCaseStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    users.add(CHECKER, Role::Checker, "Checker One");
    users.add(OTHER_CHECKER, Role::Checker, "Checker Two");
    users.add(RETIRED_CHECKER, Role::Checker, "Checker Three");
    users.deactivate(RETIRED_CHECKER);
    users.add(ADMIN, Role::Admin, "Admin");
    users.add(FAMILY, Role::Family, "Family");

    let notifier = Arc::new(notifier);
    let clock = Arc::new(ManualClock::new(t0()));
    let service = CaseLifecycleService::new(LifecycleDependencies {
        repository: Arc::clone(&store),
        users,
        notifier: Arc::clone(&notifier),
        clock: clock.clone(),
        metrics: Arc::new(LifecycleMetrics::new().unwrap()),
        config: LifecycleConfig::for_testing(),
    });
    Harness {
        store,
        notifier,
        clock,
        service,
    }
}

fn harness() -> Harness<RecordingNotifier> {
    harness_with(RecordingNotifier::default())
}

fn family() -> Principal {
    Principal::family(FAMILY)
}

fn checker() -> Principal {
    Principal::checker(CHECKER)
}

fn admin() -> Principal {
    Principal::admin(ADMIN)
}

fn donor() -> Principal {
    Principal::donor(DONOR)
}

impl<N: NotificationSender> Harness<N> {
    fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }

    async fn draft(&self) -> Case {
        let case = self
            .service
            .create_draft(&family(), complete_family_data(), Vec::new())
            .await
            .unwrap();
        self.tick();
        case
    }

    async fn submitted(&self) -> Case {
        let case = self.draft().await;
        let case = self.service.submit(&family(), &case.case_id).await.unwrap();
        self.tick();
        case
    }

    async fn under_review(&self) -> Case {
        let case = self.submitted().await;
        let case = self
            .service
            .assign(&admin(), &case.case_id, CHECKER, None)
            .await
            .unwrap();
        self.tick();
        case
    }

    async fn approved(&self, cost: Amount) -> Case {
        let case = self.under_review().await;
        let case = self
            .service
            .decide(
                &checker(),
                &case.case_id,
                DecisionInput::approve("looks valid and complete", 80.0, cost),
            )
            .await
            .unwrap();
        self.tick();
        case
    }

    async fn stored(&self, case_id: &CaseId) -> Case {
        self.store.load(case_id).await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn test_create_and_submit() {
    let h = harness();
    let draft = h.draft().await;
    assert_eq!(draft.status, CaseStatus::Draft);
    assert_eq!(draft.version, 1);
    assert!(draft.case_id.as_str().starts_with("SLA-2025-"));

    let case = h.service.submit(&family(), &draft.case_id).await.unwrap();
    assert_eq!(case.status, CaseStatus::Submitted);
    assert!(case.submitted_at.is_some());
    assert_eq!(case.audit_log.len(), 1);
    assert_eq!(case.version, 2);

    assert_eq!(h.notifier.names(), vec!["case_submitted"]);
    assert_eq!(h.service.metrics().transitions("submitted"), 1);
    assert_eq!(h.service.metrics().operations("submit"), 1);
}

#[tokio::test]
async fn test_same_instant_drafts_collide() {
    let h = harness();
    h.service
        .create_draft(&family(), identity_only(), Vec::new())
        .await
        .unwrap();
    let err = h
        .service
        .create_draft(&family(), identity_only(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::DuplicateCaseId(_)));
    assert_eq!(h.service.metrics().rejections("conflict"), 1);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_incomplete_submit_keeps_draft() {
    let h = harness();
    let draft = h
        .service
        .create_draft(&family(), identity_only(), Vec::new())
        .await
        .unwrap();
    let err = h.service.submit(&family(), &draft.case_id).await.unwrap_err();
    assert_eq!(err.kind(), crate::domain::ErrorKind::IncompleteSubmission);

    let stored = h.stored(&draft.case_id).await;
    assert_eq!(stored, draft);
    assert!(h.notifier.names().is_empty());
}

#[tokio::test]
async fn test_assign_from_draft_is_rejected_and_unchanged() {
    let h = harness();
    let draft = h.draft().await;
    let err = h
        .service
        .assign(&admin(), &draft.case_id, CHECKER, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert_eq!(h.stored(&draft.case_id).await, draft);
    assert_eq!(h.service.metrics().rejections("invalid_state"), 1);
}

#[tokio::test]
async fn test_assign_requires_active_reviewer() {
    let h = harness();
    let case = h.submitted().await;

    for target in [UserId::from_u128(0xDEAD), RETIRED_CHECKER, FAMILY] {
        let err = h
            .service
            .assign(&admin(), &case.case_id, target, None)
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::CheckerNotFound(target));
    }
    assert_eq!(h.stored(&case.case_id).await, case);
}

#[tokio::test]
async fn test_assign_and_reassign() {
    let h = harness();
    let case = h.under_review().await;
    assert_eq!(case.status, CaseStatus::UnderReview);
    assert_eq!(case.assigned_checker(), Some(CHECKER));

    let case = h
        .service
        .reassign(&admin(), &case.case_id, OTHER_CHECKER, Some("load balancing".into()))
        .await
        .unwrap();
    assert_eq!(case.assigned_checker(), Some(OTHER_CHECKER));
    assert_eq!(case.status, CaseStatus::UnderReview);

    assert_eq!(
        h.notifier.names(),
        vec!["case_submitted", "checker_assigned", "checker_reassigned"]
    );
    let events = h.notifier.events.lock();
    assert!(matches!(
        events.last(),
        Some(CaseEvent::CheckerReassigned {
            previous_checker: Some(prev),
            ..
        }) if *prev == CHECKER
    ));
}

#[tokio::test]
async fn test_checker_self_assigns_on_assign() {
    let h = harness();
    let case = h.submitted().await;
    let case = h
        .service
        .assign(&checker(), &case.case_id, CHECKER, None)
        .await
        .unwrap();
    assert_eq!(case.assigned_checker(), Some(CHECKER));

    let other = h.submitted().await;
    let err = h
        .service
        .assign(&checker(), &other.case_id, OTHER_CHECKER, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied { .. }));
}

#[tokio::test]
async fn test_decide_approve_then_fund() {
    let h = harness();
    let case = h.approved(5000).await;
    assert_eq!(case.status, CaseStatus::Approved);
    assert_eq!(case.total_needed, 5000);
    assert!(case.approved_at.is_some());

    let case = h
        .service
        .record_donation(&donor(), &case.case_id, 2000)
        .await
        .unwrap();
    assert_eq!(case.donation_progress, 40);
    h.tick();
    let case = h
        .service
        .record_donation(&donor(), &case.case_id, 3000)
        .await
        .unwrap();
    assert_eq!(case.status, CaseStatus::FullyFunded);
    assert!(case.fully_funded_at.is_some());

    let metrics = h.service.metrics();
    assert_eq!(metrics.donated_total(), 5000);
    assert_eq!(metrics.transitions("donated"), 2);
    assert_eq!(metrics.transitions("fully_funded"), 1);
    assert_eq!(
        &h.notifier.names()[2..],
        &[
            "case_decided",
            "donation_recorded",
            "donation_recorded",
            "case_fully_funded"
        ]
    );
}

#[tokio::test]
async fn test_decide_self_assign_emits_assignment() {
    let h = harness();
    let case = h.submitted().await;
    let case = h
        .service
        .decide(
            &checker(),
            &case.case_id,
            DecisionInput::reject("no damage visible in any photo"),
        )
        .await
        .unwrap();
    assert_eq!(case.status, CaseStatus::Rejected);
    assert_eq!(case.assigned_checker(), Some(CHECKER));
    assert_eq!(
        h.notifier.names(),
        vec!["case_submitted", "checker_assigned", "case_decided"]
    );
    assert_eq!(h.service.metrics().transitions("rejected"), 1);
    assert_eq!(h.service.metrics().transitions("assigned"), 0);
}

#[tokio::test]
async fn test_approve_without_cost_fails() {
    let h = harness();
    let case = h.under_review().await;
    let mut input = DecisionInput::approve("looks valid and complete", 80.0, 1);
    input.estimated_cost = None;

    let err = h
        .service
        .decide(&checker(), &case.case_id, input)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LifecycleError::MissingApprovalFields {
            fields: vec!["estimatedCost".into()]
        }
    );
    assert_eq!(h.stored(&case.case_id).await.status, CaseStatus::UnderReview);
}

#[tokio::test]
async fn test_recompute_is_idempotent_and_skips_save() {
    let h = harness();
    let case = h.approved(5000).await;

    // donation ledger writes total_raised directly
    let mut external = case.clone();
    external.total_raised = 5000;
    h.store.save(external, case.version).await.unwrap();

    let funded = h
        .service
        .recompute_donation_progress(&admin(), &case.case_id)
        .await
        .unwrap();
    assert_eq!(funded.status, CaseStatus::FullyFunded);
    assert_eq!(funded.donation_progress, 100);
    let funded_at = funded.fully_funded_at;

    h.tick();
    let again = h
        .service
        .recompute_donation_progress(&admin(), &case.case_id)
        .await
        .unwrap();
    assert_eq!(again, funded);
    assert_eq!(again.fully_funded_at, funded_at);
    assert_eq!(again.audit_log.by_action(AuditAction::FullyFunded).count(), 1);
    assert_eq!(h.service.metrics().transitions("fully_funded"), 1);
}

#[tokio::test]
async fn test_notification_failure_keeps_transition() {
    let h = harness_with(FailingNotifier);
    let case = h.submitted().await;
    assert_eq!(case.status, CaseStatus::Submitted);
    assert_eq!(h.stored(&case.case_id).await.status, CaseStatus::Submitted);
}

#[tokio::test]
async fn test_files_and_delete() {
    let h = harness();
    let draft = h.draft().await;
    let file = UploadedFile::new(
        "roof.png",
        "image/png",
        FileCategory::PropertyDamage,
        vec![1, 2, 3, 4],
        t0(),
    );
    let checksum = file.checksum.clone();

    let case = h
        .service
        .attach_file(&family(), &draft.case_id, file)
        .await
        .unwrap();
    assert_eq!(case.uploaded_files.len(), 1);

    let case = h
        .service
        .remove_file(&family(), &draft.case_id, &checksum)
        .await
        .unwrap();
    assert!(case.uploaded_files.is_empty());

    let err = h
        .service
        .delete_draft(&Principal::family(OTHER_FAMILY), &draft.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied { .. }));

    h.service.delete_draft(&family(), &draft.case_id).await.unwrap();
    assert!(h.store.is_empty());
    assert_eq!(h.notifier.names(), vec!["draft_deleted"]);

    let err = h.service.submit(&family(), &draft.case_id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::CaseNotFound(_)));
}

#[tokio::test]
async fn test_delete_after_submit_is_invalid_state() {
    let h = harness();
    let case = h.submitted().await;
    let err = h
        .service
        .delete_draft(&family(), &case.case_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_read_visibility() {
    let h = harness();
    let submitted = h.submitted().await;
    let approved = h.approved(1000).await;

    assert!(matches!(
        h.service.get_case(&donor(), &submitted.case_id).await,
        Err(LifecycleError::AccessDenied { .. })
    ));
    assert!(h.service.get_case(&donor(), &approved.case_id).await.is_ok());
    assert!(matches!(
        h.service
            .get_case(&Principal::family(OTHER_FAMILY), &submitted.case_id)
            .await,
        Err(LifecycleError::AccessDenied { .. })
    ));

    let mine = h.service.list_cases(&family(), &CaseQuery::all()).await.unwrap();
    assert_eq!(mine.len(), 2);
    let theirs = h
        .service
        .list_cases(&Principal::family(OTHER_FAMILY), &CaseQuery::all())
        .await
        .unwrap();
    assert!(theirs.is_empty());
    let donor_view = h.service.list_cases(&donor(), &CaseQuery::all()).await.unwrap();
    assert_eq!(donor_view.len(), 1);
}

#[tokio::test]
async fn test_review_queue_and_stats() {
    let h = harness();
    h.submitted().await;
    h.under_review().await;
    let reviewed = h.under_review().await;
    h.clock.advance(Duration::hours(3));
    h.service
        .decide(
            &checker(),
            &reviewed.case_id,
            DecisionInput::reject("duplicate of an earlier claim"),
        )
        .await
        .unwrap();

    let queue = h.service.review_queue(&checker()).await.unwrap();
    assert_eq!(queue.len(), 2);

    assert!(matches!(
        h.service.review_queue(&donor()).await,
        Err(LifecycleError::AccessDenied { .. })
    ));

    let stats = h.service.checker_stats(&checker(), CHECKER).await.unwrap();
    assert_eq!(stats.total_assigned, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.average_review_hours, 3);
    assert_eq!(stats.available, 1);

    assert!(h
        .service
        .checker_stats(&Principal::checker(OTHER_CHECKER), CHECKER)
        .await
        .is_err());
}

#[tokio::test]
async fn test_admin_views_and_public_stats() {
    let h = harness();
    h.submitted().await;
    let approved = h.approved(4000).await;
    h.service
        .record_donation(&donor(), &approved.case_id, 1000)
        .await
        .unwrap();

    let board = h.service.kanban(&admin()).await.unwrap();
    assert_eq!(board.submitted.len(), 1);
    assert_eq!(board.approved.len(), 1);
    assert!(h.service.kanban(&checker()).await.is_err());

    let villages = h.service.village_summaries(&admin()).await.unwrap();
    assert_eq!(villages.len(), 1);
    assert_eq!(villages[0].total, 2);

    let funding = h.service.funding_summary(CaseStatus::Approved).await.unwrap();
    assert_eq!(funding.families, 1);
    assert_eq!(funding.overall_progress, 25);

    let platform = h.service.platform_stats().await.unwrap();
    assert_eq!(platform.total_cases, 2);
    assert_eq!(platform.families_helped, 1);

    let impact = h.service.impact_stats().await.unwrap();
    assert_eq!(impact.funds_raised, 1000);

    let text = h.service.metrics().gather_text().unwrap();
    assert!(text.contains("sla_cases"));
}
