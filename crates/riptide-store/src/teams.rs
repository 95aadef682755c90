//! Team cache: team records plus the set of teams the requesting user
//! belongs to.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use riptide_shared::models::Team;
use riptide_shared::types::TeamId;

#[derive(Debug, Default)]
pub struct TeamStore {
    teams: HashMap<TeamId, Team>,
    my_team_ids: HashSet<TeamId>,
}

impl TeamStore {
    pub fn upsert(&mut self, team: Team) -> bool {
        if let Some(existing) = self.teams.get(&team.id) {
            if existing.update_at >= team.update_at {
                debug!(team = %team.id, "ignoring stale team update");
                return false;
            }
        }
        self.teams.insert(team.id.clone(), team);
        true
    }

    pub fn get(&self, id: &TeamId) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn remove(&mut self, id: &TeamId) {
        self.teams.remove(id);
        self.my_team_ids.remove(id);
    }

    pub fn join(&mut self, id: TeamId) {
        self.my_team_ids.insert(id);
    }

    pub fn leave(&mut self, id: &TeamId) {
        self.my_team_ids.remove(id);
    }

    pub fn is_mine(&self, id: &TeamId) -> bool {
        self.my_team_ids.contains(id)
    }

    pub fn my_teams(&self) -> Vec<&Team> {
        let mut teams: Vec<&Team> = self
            .my_team_ids
            .iter()
            .filter_map(|id| self.teams.get(id))
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        teams
    }

    /// Another live team the user belongs to, for relocating them when
    /// their current team goes away. Sorted by name for determinism.
    pub fn other_joined_team(&self, excluding: &TeamId) -> Option<&Team> {
        self.my_teams()
            .into_iter()
            .find(|t| &t.id != excluding && t.delete_at == 0)
    }

    pub fn clear(&mut self) {
        self.teams.clear();
        self.my_team_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, name: &str, update_at: i64) -> Team {
        Team {
            id: TeamId::from(id),
            name: name.to_string(),
            display_name: name.to_string(),
            update_at,
            delete_at: 0,
        }
    }

    #[test]
    fn test_other_joined_team_skips_excluded_and_deleted() {
        let mut store = TeamStore::default();
        store.upsert(team("t1", "alpha", 1));
        store.upsert(team("t2", "beta", 1));
        let mut dead = team("t3", "aaa-dead", 1);
        dead.delete_at = 50;
        store.upsert(dead);
        store.join(TeamId::from("t1"));
        store.join(TeamId::from("t2"));
        store.join(TeamId::from("t3"));

        let other = store.other_joined_team(&TeamId::from("t1")).unwrap();
        assert_eq!(other.id, TeamId::from("t2"));
    }

    #[test]
    fn test_stale_team_update_is_ignored() {
        let mut store = TeamStore::default();
        store.upsert(team("t1", "alpha", 200));
        assert!(!store.upsert(team("t1", "alpha-old", 100)));
        assert_eq!(store.get(&TeamId::from("t1")).unwrap().name, "alpha");
    }
}
