//! In-memory user directory.

use crate::ports::{UserDirectory, UserRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Role, UserId};
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn upsert(&self, record: UserRecord) {
        self.users.write().insert(record.id, record);
    }

    /// Adds an active user with `role`.
    pub fn add(&self, id: UserId, role: Role, display_name: impl Into<String>) {
        self.upsert(UserRecord {
            id,
            role,
            is_active: true,
            display_name: display_name.into(),
        });
    }

    /// Marks a user inactive. Returns false for unknown users.
    pub fn deactivate(&self, id: UserId) -> bool {
        match self.users.write().get_mut(&id) {
            Some(record) => {
                record.is_active = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Option<UserRecord> {
        self.users.read().get(&id).cloned()
    }
}
