//! # Lifecycle Flows
//!
//! Walks cases through intake, review and funding against the real store
//! and checks what was persisted, not just what was returned.
//!
//! ## Flows Tested:
//!
//! 1. **Intake**: draft → submitted (scenario A)
//! 2. **Review**: submitted → under_review → approved (scenarios B, C)
//! 3. **Funding**: approved → fully_funded, idempotent closure (scenario D)
//! 4. **Guards**: illegal transitions leave the stored case untouched (scenario E)
//! 5. **Concurrency**: racing writers never lose a donation

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use shared_types::{CaseStatus, Principal};
    use sla_case_lifecycle::{
        AuditAction, CaseLifecycleApi, CaseRepository, DecisionInput, ErrorKind, LifecycleError,
    };

    use crate::integration::harness::*;

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_a_submit_complete_draft() {
        let h = Harness::in_memory();
        let draft = h.draft("Khiam").await;
        assert_eq!(draft.status, CaseStatus::Draft);
        assert!(draft.audit_log.is_empty());
        assert_eq!(draft.form_completion, 100);

        let case = h.service.submit(&family(), &draft.case_id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Submitted);
        assert!(case.submitted_at.is_some());
        assert_eq!(case.audit_log.len(), 1);
        assert_eq!(
            case.audit_log.latest().map(|e| e.action()),
            Some(AuditAction::Submitted)
        );

        let stored = h.store.load(&case.case_id).await.unwrap().unwrap();
        assert_eq!(stored, case);
    }

    #[tokio::test]
    async fn test_scenario_b_assign_checker() {
        let h = Harness::in_memory();
        let case = h.submitted("Khiam").await;

        let case = h
            .service
            .assign(&admin(), &case.case_id, C1, Some("closest to Khiam".into()))
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::UnderReview);
        assert_eq!(case.assigned_checker(), Some(C1));
        assert!(case.review_started_at.is_some());

        let assignment = case.checker_assignment.as_ref().unwrap();
        assert_eq!(assignment.assigned_by, ADMIN);
        assert_eq!(assignment.notes.as_deref(), Some("closest to Khiam"));
    }

    #[tokio::test]
    async fn test_scenario_c_approve_sets_need() {
        let h = Harness::in_memory();
        let case = h.under_review("Khiam").await;

        let case = h
            .service
            .decide(
                &checker(),
                &case.case_id,
                DecisionInput::approve("looks valid and complete", 80.0, 5000),
            )
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::Approved);
        assert_eq!(case.total_needed, 5000);
        assert_eq!(case.donation_progress, 0);
        assert!(case.approved_at.is_some());

        let decision = case.checker_decision.as_ref().unwrap();
        assert_eq!(decision.checker_id, C1);
        assert_eq!(decision.estimated_cost, Some(5000));
    }

    #[tokio::test]
    async fn test_scenario_d_ledger_closes_case_once() {
        let h = Harness::in_memory();
        let case = h.approved("Khiam", 5000).await;

        // the donation ledger credits total_raised directly
        let mut credited = case.clone();
        credited.total_raised = 5000;
        h.store.save(credited, case.version).await.unwrap();

        let funded = h
            .service
            .recompute_donation_progress(&admin(), &case.case_id)
            .await
            .unwrap();
        assert_eq!(funded.donation_progress, 100);
        assert_eq!(funded.status, CaseStatus::FullyFunded);
        let funded_at = funded.fully_funded_at.expect("closure timestamp");

        h.clock.advance(Duration::hours(6));
        let again = h
            .service
            .recompute_donation_progress(&admin(), &case.case_id)
            .await
            .unwrap();
        assert_eq!(again.fully_funded_at, Some(funded_at));
        assert_eq!(again.version, funded.version);
        assert_eq!(
            again.audit_log.by_action(AuditAction::FullyFunded).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_scenario_e_assign_draft_is_rejected() {
        let h = Harness::in_memory();
        let draft = h.draft("Khiam").await;

        let err = h
            .service
            .assign(&admin(), &draft.case_id, C1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { .. }));

        let stored = h.store.load(&draft.case_id).await.unwrap().unwrap();
        assert_eq!(stored, draft);
    }

    // =============================================================================
    // FULL JOURNEYS
    // =============================================================================

    #[tokio::test]
    async fn test_journey_with_reassignment_and_donations() {
        let h = Harness::in_memory();
        let case = h.under_review("Bint Jbeil").await;

        let case = h
            .service
            .reassign(&admin(), &case.case_id, C2, Some("C1 on leave".into()))
            .await
            .unwrap();
        h.tick();

        // the previous checker no longer has access
        let err = h
            .service
            .decide(
                &checker(),
                &case.case_id,
                DecisionInput::approve("looks valid and complete", 70.0, 3000),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        let case = h
            .service
            .decide(
                &Principal::checker(C2),
                &case.case_id,
                DecisionInput::approve("verified on site with neighbours", 70.0, 3000)
                    .with_field_notes("north wall standing"),
            )
            .await
            .unwrap();
        h.tick();

        let case = h
            .service
            .record_donation(&donor(), &case.case_id, 1000)
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::Approved);
        assert_eq!(case.donation_progress, 33);
        h.tick();

        let case = h
            .service
            .record_donation(&donor(), &case.case_id, 2000)
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::FullyFunded);
        assert_eq!(case.donation_progress, 100);
        assert_eq!(case.remaining_need(), 0);

        let actions: Vec<_> = case.audit_log.iter().map(|e| e.action()).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Submitted,
                AuditAction::Assigned,
                AuditAction::Reassigned,
                AuditAction::Approved,
                AuditAction::Donated,
                AuditAction::Donated,
                AuditAction::FullyFunded,
            ]
        );
        let timestamps: Vec<_> = case.audit_log.iter().map(|e| e.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));

        // fully_funded is terminal
        let err = h
            .service
            .record_donation(&donor(), &case.case_id, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_rejection_is_terminal() {
        let h = Harness::in_memory();
        let case = h.under_review("Qana").await;
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
        assert_eq!(case.total_needed, 0);
        assert!(case.approved_at.is_none());

        let again = h
            .service
            .decide(
                &admin(),
                &case.case_id,
                DecisionInput::approve("second opinion says valid", 60.0, 900),
            )
            .await
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::InvalidState);

        let donation = h
            .service
            .record_donation(&donor(), &case.case_id, 100)
            .await
            .unwrap_err();
        assert_eq!(donation.kind(), ErrorKind::InvalidState);

        let stored = h.store.load(&case.case_id).await.unwrap().unwrap();
        assert_eq!(stored, case);
    }

    #[tokio::test]
    async fn test_incomplete_draft_lists_missing_fields() {
        let h = Harness::in_memory();
        let draft = h
            .service
            .create_draft(&family(), identity_only(), Vec::new())
            .await
            .unwrap();

        let err = h.service.submit(&family(), &draft.case_id).await.unwrap_err();
        let LifecycleError::IncompleteSubmission { missing } = &err else {
            panic!("expected IncompleteSubmission, got {err:?}");
        };
        assert!(missing.iter().any(|f| f == "village"));
        assert!(missing.iter().any(|f| f == "destructionPercentage"));

        // filling the gaps makes it submittable
        let case = h
            .service
            .update_draft(
                &family(),
                &draft.case_id,
                Some(complete_family_data("Khiam")),
                None,
            )
            .await
            .unwrap();
        let case = h.service.submit(&family(), &case.case_id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Submitted);
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_donations_never_lose_updates() {
        let h = Harness::in_memory();
        let case = h.approved("Khiam", 100_000).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&h.service);
            let case_id = case.case_id.clone();
            handles.push(tokio::spawn(async move {
                service.record_donation(&donor(), &case_id, 250).await
            }));
        }

        let mut accepted = 0u64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
            }
        }
        assert!(accepted >= 1);

        let stored = h.store.load(&case.case_id).await.unwrap().unwrap();
        assert_eq!(stored.total_raised, 250 * accepted);
        assert_eq!(
            stored.audit_log.by_action(AuditAction::Donated).count() as u64,
            accepted
        );
    }

    // =============================================================================
    // READ MODELS
    // =============================================================================

    #[tokio::test]
    async fn test_read_models_follow_the_flow() {
        let h = Harness::in_memory();
        h.draft("Tyre").await;
        h.submitted("Khiam").await;
        let funded = h.approved("khiam ", 2000).await;
        h.service
            .record_donation(&donor(), &funded.case_id, 2000)
            .await
            .unwrap();
        let rejected = h.under_review("Tyre").await;
        h.service
            .decide(
                &checker(),
                &rejected.case_id,
                DecisionInput::reject("duplicate of an earlier claim"),
            )
            .await
            .unwrap();

        let villages = h.service.village_summaries(&admin()).await.unwrap();
        assert_eq!(villages.len(), 2);
        assert_eq!(villages[0].total, 2);
        assert_eq!(villages[0].pending, 1);
        assert_eq!(villages[0].approved, 1);
        assert_eq!(villages[0].funded_percentage, 100);
        assert_eq!(villages[1].rejected, 1);

        let platform = h.service.platform_stats().await.unwrap();
        assert_eq!(platform.total_cases, 4);
        assert_eq!(platform.families_helped, 1);
        assert_eq!(platform.villages_covered, 1);
        assert_eq!(platform.verified_cases, 2);
        assert_eq!(platform.verification_percentage, 50);

        let funded_listing = h
            .service
            .funding_summary(CaseStatus::FullyFunded)
            .await
            .unwrap();
        assert_eq!(funded_listing.case_ids, vec![funded.case_id.clone()]);
        assert_eq!(funded_listing.overall_progress, 100);

        let drafts = h.service.funding_summary(CaseStatus::Draft).await.unwrap();
        assert_eq!(drafts.families, 0);

        // the family sees its own four cases, the donor only the funded one
        let mine = h
            .service
            .list_cases(&family(), &sla_case_lifecycle::CaseQuery::all())
            .await
            .unwrap();
        assert_eq!(mine.len(), 4);
        let donor_view = h
            .service
            .list_cases(&donor(), &sla_case_lifecycle::CaseQuery::all())
            .await
            .unwrap();
        assert_eq!(donor_view.len(), 1);
        let neighbour_view = h
            .service
            .list_cases(
                &Principal::family(NEIGHBOUR),
                &sla_case_lifecycle::CaseQuery::all(),
            )
            .await
            .unwrap();
        assert!(neighbour_view.is_empty());
    }

    // =============================================================================
    // ROCKSDB
    // =============================================================================

    #[cfg(feature = "rocksdb")]
    #[tokio::test]
    async fn test_rocksdb_store_survives_reopen() {
        use sla_case_lifecycle::adapters::{RocksDbCaseStore, RocksDbConfig};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();

        let case = {
            let store = RocksDbCaseStore::open(RocksDbConfig::for_testing(path.clone())).unwrap();
            let h = Harness::with_store(store);
            let case = h.approved("Khiam", 5000).await;
            h.service
                .record_donation(&donor(), &case.case_id, 5000)
                .await
                .unwrap()
        };
        assert_eq!(case.status, CaseStatus::FullyFunded);

        let reopened = RocksDbCaseStore::open(RocksDbConfig::for_testing(path)).unwrap();
        let stored = reopened.load(&case.case_id).await.unwrap().unwrap();
        assert_eq!(stored, case);

        let funded = reopened
            .find(&sla_case_lifecycle::CaseQuery::with_status([CaseStatus::FullyFunded]))
            .await
            .unwrap();
        assert_eq!(funded.len(), 1);
    }
}
