//! In-memory client cache.
//!
//! One [`Store`] aggregates the per-entity caches. All writes are
//! ID-keyed upserts; records carrying an `update_at` older than the
//! cached one are dropped, which is what makes replayed pushes and
//! push/fetch races harmless.

pub mod channels;
pub mod posts;
pub mod preferences;
pub mod teams;
pub mod users;

pub use channels::ChannelStore;
pub use posts::PostStore;
pub use preferences::PreferenceStore;
pub use teams::TeamStore;
pub use users::UserStore;

#[derive(Debug, Default)]
pub struct Store {
    pub channels: ChannelStore,
    pub posts: PostStore,
    pub users: UserStore,
    pub teams: TeamStore,
    pub preferences: PreferenceStore,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.posts.clear();
        self.users.clear();
        self.teams.clear();
        self.preferences.clear();
    }
}
