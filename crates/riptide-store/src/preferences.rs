//! Preference cache, keyed by (category, name).

use std::collections::HashMap;

use riptide_shared::models::Preference;

#[derive(Debug, Default)]
pub struct PreferenceStore {
    entries: HashMap<(String, String), Preference>,
}

impl PreferenceStore {
    pub fn set(&mut self, preference: Preference) {
        self.entries.insert(
            (preference.category.clone(), preference.name.clone()),
            preference,
        );
    }

    pub fn set_many(&mut self, preferences: Vec<Preference>) {
        for preference in preferences {
            self.set(preference);
        }
    }

    pub fn delete_many(&mut self, preferences: &[Preference]) {
        for preference in preferences {
            self.entries
                .remove(&(preference.category.clone(), preference.name.clone()));
        }
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&Preference> {
        self.entries
            .get(&(category.to_string(), name.to_string()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
