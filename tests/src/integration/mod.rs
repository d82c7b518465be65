//! # Integration Flows
//!
//! Drives `CaseLifecycleService` through its public API with the real
//! adapters: the in-memory (or RocksDB) case store, the in-memory user
//! directory, a manual clock and the shared event bus.
//!
//! ```text
//! [Family] ──create/submit──→ ┌────────────────────┐ ──CaseEvent──→ [InMemoryEventBus]
//! [Admin]  ──assign─────────→ │ CaseLifecycleService│                    │
//! [Checker]──decide─────────→ │                    │          ┌─────────┼──────────┐
//! [Donor]  ──donate─────────→ └────────┬───────────┘          ↓         ↓          ↓
//!                                      ↓                  Submission  Review    Funding
//!                               CaseRepository               subscribers by topic
//! ```

pub mod bus_flows;
pub mod lifecycle_flows;

// =============================================================================
// TEST HARNESS (only compiled during tests)
// =============================================================================

#[cfg(test)]
pub(crate) mod harness {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use shared_bus::InMemoryEventBus;
    use shared_types::{Principal, Role, Timestamp, UserId};
    use sla_case_lifecycle::adapters::{
        BusNotificationSender, InMemoryCaseStore, InMemoryUserDirectory, ManualClock,
    };
    use sla_case_lifecycle::{
        Case, CaseLifecycleApi, CaseLifecycleService, CaseRepository, DecisionInput, FamilyData,
        LifecycleConfig, LifecycleDependencies,
    };
    use sla_telemetry::LifecycleMetrics;

    pub const FAMILY: UserId = UserId::from_u128(0x0F01);
    pub const NEIGHBOUR: UserId = UserId::from_u128(0x0F02);
    pub const C1: UserId = UserId::from_u128(0x0C01);
    pub const C2: UserId = UserId::from_u128(0x0C02);
    pub const ADMIN: UserId = UserId::from_u128(0x0A01);
    pub const DONOR: UserId = UserId::from_u128(0x0D01);

    pub type Service<R> =
        CaseLifecycleService<R, InMemoryUserDirectory, BusNotificationSender<InMemoryEventBus>>;

    pub struct Harness<R: CaseRepository> {
        pub store: Arc<R>,
        pub bus: Arc<InMemoryEventBus>,
        pub clock: Arc<ManualClock>,
        pub service: Arc<Service<R>>,
    }

    pub fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap()
    }

    pub fn family() -> Principal {
        Principal::family(FAMILY)
    }

    pub fn checker() -> Principal {
        Principal::checker(C1)
    }

    pub fn admin() -> Principal {
        Principal::admin(ADMIN)
    }

    pub fn donor() -> Principal {
        Principal::donor(DONOR)
    }

    /// Every field a draft needs before it can be submitted.
    pub fn complete_family_data(village: &str) -> FamilyData {
        FamilyData {
            family_name: Some("Haddad".into()),
            head_of_household: Some("Karim Haddad".into()),
            phone_number: Some("+96170123456".into()),
            number_of_members: Some(5),
            children_count: 3,
            village: Some(village.into()),
            current_address: Some("Building 4, Hamra Street, Beirut".into()),
            original_address: Some(format!("Main Road, {village}")),
            destruction_date: NaiveDate::from_ymd_opt(2024, 10, 3),
            destruction_cause: Some("Airstrike".into()),
            destruction_percentage: Some(80),
            damage_description: Some("Roof collapsed and east wall destroyed".into()),
            previously_received_aid: Some(false),
            ..FamilyData::default()
        }
    }

    /// Enough to create a draft, not enough to submit it.
    pub fn identity_only() -> FamilyData {
        FamilyData {
            family_name: Some("Khoury".into()),
            head_of_household: Some("Rima Khoury".into()),
            phone_number: Some("+96171000000".into()),
            ..FamilyData::default()
        }
    }

    impl Harness<InMemoryCaseStore> {
        pub fn in_memory() -> Self {
            Self::with_store(InMemoryCaseStore::new())
        }
    }

    impl<R: CaseRepository> Harness<R> {
        pub fn with_store(store: R) -> Self {
            let store = Arc::new(store);
            let users = Arc::new(InMemoryUserDirectory::new());
            users.add(FAMILY, Role::Family, "Haddad family");
            users.add(NEIGHBOUR, Role::Family, "Khoury family");
            users.add(C1, Role::Checker, "Field checker one");
            users.add(C2, Role::Checker, "Field checker two");
            users.add(ADMIN, Role::Admin, "Platform admin");
            users.add(DONOR, Role::Donor, "Donor");

            let bus = Arc::new(InMemoryEventBus::new());
            let clock = Arc::new(ManualClock::new(t0()));
            let service = Arc::new(CaseLifecycleService::new(LifecycleDependencies {
                repository: Arc::clone(&store),
                users,
                notifier: Arc::new(BusNotificationSender::new(Arc::clone(&bus))),
                clock: clock.clone(),
                metrics: Arc::new(LifecycleMetrics::new().unwrap()),
                config: LifecycleConfig::for_testing(),
            }));
            Self {
                store,
                bus,
                clock,
                service,
            }
        }

        /// Moves the clock forward so the next draft gets a fresh id.
        pub fn tick(&self) {
            self.clock.advance(Duration::minutes(1));
        }

        pub async fn draft(&self, village: &str) -> Case {
            let case = self
                .service
                .create_draft(&family(), complete_family_data(village), Vec::new())
                .await
                .unwrap();
            self.tick();
            case
        }

        pub async fn submitted(&self, village: &str) -> Case {
            let case = self.draft(village).await;
            let case = self.service.submit(&family(), &case.case_id).await.unwrap();
            self.tick();
            case
        }

        pub async fn under_review(&self, village: &str) -> Case {
            let case = self.submitted(village).await;
            let case = self
                .service
                .assign(&admin(), &case.case_id, C1, None)
                .await
                .unwrap();
            self.tick();
            case
        }

        pub async fn approved(&self, village: &str, cost: u64) -> Case {
            let case = self.under_review(village).await;
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
    }
}
