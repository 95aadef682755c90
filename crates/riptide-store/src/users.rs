//! User cache: profiles and presence.

use std::collections::HashMap;

use tracing::debug;

use riptide_shared::models::{Status, User, UserStatus};
use riptide_shared::types::UserId;

#[derive(Debug, Default)]
pub struct UserStore {
    profiles: HashMap<UserId, User>,
    statuses: HashMap<UserId, UserStatus>,
}

impl UserStore {
    pub fn upsert(&mut self, user: User) -> bool {
        if let Some(existing) = self.profiles.get(&user.id) {
            if existing.update_at >= user.update_at {
                debug!(user = %user.id, "ignoring stale profile update");
                return false;
            }
        }
        self.profiles.insert(user.id.clone(), user);
        true
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.profiles.get(id)
    }

    /// IDs of every cached profile, for bulk status refetches.
    pub fn profile_ids(&self) -> Vec<UserId> {
        self.profiles.keys().cloned().collect()
    }

    pub fn set_status(&mut self, user_id: UserId, status: UserStatus) {
        self.statuses.insert(user_id, status);
    }

    pub fn set_statuses(&mut self, statuses: Vec<Status>) {
        for status in statuses {
            self.statuses.insert(status.user_id, status.status);
        }
    }

    /// Presence for a user, `Offline` when nothing is cached.
    pub fn status(&self, id: &UserId) -> UserStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
        self.statuses.clear();
    }
}
