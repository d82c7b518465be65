//! In-memory case store.
//!
//! Suitable for tests and single-process deployments. Compare-and-swap is
//! exact: the version check and the write happen under one write lock.

use crate::domain::Case;
use crate::ports::{CaseQuery, CaseRepository, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::CaseId;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<CaseId, Case>>,
}

impl InMemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.read().is_empty()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseStore {
    async fn insert(&self, mut case: Case) -> Result<Case, StoreError> {
        let mut cases = self.cases.write();
        if cases.contains_key(&case.case_id) {
            return Err(StoreError::Duplicate(case.case_id));
        }
        case.version = 1;
        cases.insert(case.case_id.clone(), case.clone());
        Ok(case)
    }

    async fn load(&self, case_id: &CaseId) -> Result<Option<Case>, StoreError> {
        Ok(self.cases.read().get(case_id).cloned())
    }

    async fn save(&self, mut case: Case, expected_version: u64) -> Result<Case, StoreError> {
        let mut cases = self.cases.write();
        let Some(stored) = cases.get_mut(&case.case_id) else {
            return Err(StoreError::NotFound(case.case_id));
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                case_id: case.case_id,
                expected: expected_version,
                found: stored.version,
            });
        }
        case.version = expected_version + 1;
        *stored = case.clone();
        Ok(case)
    }

    async fn delete(&self, case_id: &CaseId, expected_version: u64) -> Result<(), StoreError> {
        let mut cases = self.cases.write();
        let Some(stored) = cases.get(case_id) else {
            return Err(StoreError::NotFound(case_id.clone()));
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                case_id: case_id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        cases.remove(case_id);
        Ok(())
    }

    async fn find(&self, query: &CaseQuery) -> Result<Vec<Case>, StoreError> {
        let mut found: Vec<Case> = self
            .cases
            .read()
            .values()
            .filter(|case| query.matches(case))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        Ok(found)
    }
}
