//! # Event Bus Flows
//!
//! Checks that the lifecycle service, wired to `BusNotificationSender`,
//! publishes exactly one event per persisted transition and that bus
//! subscribers see them in order.
//!
//! ## Flow Tested:
//!
//! ```text
//! submit ──→ CaseSubmitted       (Submission)
//! assign ──→ CheckerAssigned     (Review)
//! decide ──→ CaseDecided         (Review)
//! donate ──→ DonationRecorded    (Funding)
//!        └─→ CaseFullyFunded     (Funding, once)
//! ```

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shared_bus::{CaseEvent, EventFilter, EventPublisher, EventTopic};
    use shared_types::{CaseStatus, Decision};
    use sla_case_lifecycle::{CaseLifecycleApi, DecisionInput};
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use crate::integration::harness::*;

    fn names(events: &[CaseEvent]) -> Vec<&'static str> {
        events.iter().map(CaseEvent::name).collect()
    }

    #[tokio::test]
    async fn test_full_flow_publishes_in_order() {
        let h = Harness::in_memory();
        let mut all = h.bus.subscribe(EventFilter::all());

        let case = h.approved("Khiam", 5000).await;
        h.service
            .record_donation(&donor(), &case.case_id, 5000)
            .await
            .unwrap();

        let events = all.drain();
        assert_eq!(
            names(&events),
            vec![
                "case_submitted",
                "checker_assigned",
                "case_decided",
                "donation_recorded",
                "case_fully_funded",
            ]
        );
        assert!(events.iter().all(|e| e.case_id() == &case.case_id));

        assert!(matches!(
            &events[2],
            CaseEvent::CaseDecided {
                decision: Decision::Approved,
                estimated_cost: Some(5000),
                decided_by,
                ..
            } if *decided_by == C1
        ));
        assert!(matches!(
            &events[4],
            CaseEvent::CaseFullyFunded { total_raised: 5000, owner, .. } if *owner == FAMILY
        ));
    }

    #[tokio::test]
    async fn test_topic_subscribers_see_only_their_topic() {
        let h = Harness::in_memory();
        let mut review = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Review]));
        let mut funding = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Funding]));

        let case = h.approved("Khiam", 4000).await;
        h.service
            .record_donation(&donor(), &case.case_id, 1000)
            .await
            .unwrap();

        assert_eq!(
            names(&review.drain()),
            vec!["checker_assigned", "case_decided"]
        );
        let funding_events = funding.drain();
        assert_eq!(names(&funding_events), vec!["donation_recorded"]);
        assert!(matches!(
            funding_events[0],
            CaseEvent::DonationRecorded {
                amount: 1000,
                total_raised: 1000,
                donation_progress: 25,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_case_filter_isolates_one_case() {
        let h = Harness::in_memory();
        let first = h.draft("Khiam").await;
        let second = h.draft("Tyre").await;
        let mut watcher = h
            .bus
            .subscribe(EventFilter::for_cases(vec![second.case_id.clone()]));

        h.service.submit(&family(), &first.case_id).await.unwrap();
        h.service.submit(&family(), &second.case_id).await.unwrap();
        h.service.delete_draft(&family(), &first.case_id).await.unwrap_err();

        let events = watcher.drain();
        assert_eq!(names(&events), vec!["case_submitted"]);
        assert!(matches!(
            &events[0],
            CaseEvent::CaseSubmitted { village: Some(v), .. } if v == "Tyre"
        ));
    }

    #[tokio::test]
    async fn test_failed_operations_publish_nothing() {
        let h = Harness::in_memory();
        let mut all = h.bus.subscribe(EventFilter::all());
        let draft = h.draft("Khiam").await;
        let published = h.bus.events_published();

        h.service
            .assign(&admin(), &draft.case_id, C1, None)
            .await
            .unwrap_err();
        h.service
            .record_donation(&donor(), &draft.case_id, 100)
            .await
            .unwrap_err();
        h.service
            .decide(
                &checker(),
                &draft.case_id,
                DecisionInput::reject("nothing to review here yet"),
            )
            .await
            .unwrap_err();

        assert!(all.drain().is_empty());
        assert_eq!(h.bus.events_published(), published);
    }

    #[tokio::test]
    async fn test_decide_on_unassigned_case_announces_self_assignment() {
        let h = Harness::in_memory();
        let case = h.submitted("Khiam").await;
        let mut review = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Review]));

        let case = h
            .service
            .decide(
                &checker(),
                &case.case_id,
                DecisionInput::reject("photos show a different building"),
            )
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::Rejected);

        let events = review.drain();
        assert_eq!(names(&events), vec!["checker_assigned", "case_decided"]);
        assert!(matches!(
            &events[0],
            CaseEvent::CheckerAssigned {
                self_assigned: true,
                checker_id,
                assigned_by,
                ..
            } if *checker_id == C1 && *assigned_by == C1
        ));
    }

    #[tokio::test]
    async fn test_funding_consumer_task_sees_closure() {
        let h = Harness::in_memory();
        let stream = h
            .bus
            .event_stream(EventFilter::topics(vec![EventTopic::Funding]));

        // read-side consumer running on its own task
        let consumer = tokio::spawn(async move {
            stream
                .filter(|e| matches!(e, CaseEvent::CaseFullyFunded { .. }))
                .take(1)
                .collect::<Vec<_>>()
                .await
        });

        let case = h.approved("Khiam", 3000).await;
        h.service
            .record_donation(&donor(), &case.case_id, 1000)
            .await
            .unwrap();
        h.service
            .record_donation(&donor(), &case.case_id, 2000)
            .await
            .unwrap();

        let closed = timeout(Duration::from_secs(2), consumer)
            .await
            .expect("consumer finished")
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].case_id(), &case.case_id);
    }

    #[tokio::test]
    async fn test_transitions_succeed_without_subscribers() {
        let h = Harness::in_memory();
        assert_eq!(h.bus.subscriber_count(), 0);

        let case = h.approved("Khiam", 1000).await;
        assert_eq!(case.status, CaseStatus::Approved);
        assert_eq!(h.bus.events_published(), 3);
    }
}
