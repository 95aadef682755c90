//! Preference events.

use riptide_shared::models::Preference;

use crate::dispatch::Reconciler;

pub(crate) fn handle_preference_changed(rc: &Reconciler, preference: Preference) {
    rc.with_session(|s| s.store.preferences.set(preference));
}

pub(crate) fn handle_preferences_changed(rc: &Reconciler, preferences: Vec<Preference>) {
    rc.with_session(|s| s.store.preferences.set_many(preferences));
}

pub(crate) fn handle_preferences_deleted(rc: &Reconciler, preferences: Vec<Preference>) {
    rc.with_session(|s| s.store.preferences.delete_many(&preferences));
}
