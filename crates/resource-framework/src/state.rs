//! # Resource State
//!
//! The flags every resource and every resource collection carries. The
//! transitions live here so resources and collections cannot drift apart.
//!
//! | Flag        | Set                                      | Cleared                          |
//! |-------------|------------------------------------------|----------------------------------|
//! | `is_new`    | construction                             | primary key assigned / loaded    |
//! | `is_dirty`  | tracked change while loaded or new       | successful save or load          |
//! | `is_saving` | save issued                              | save settled                     |
//! | `is_loaded` | any round-trip settled                   | never                            |
//! | `is_error`  | failed operation                         | next successful operation        |
//!
//! For a [`Resource`](crate::resource::Resource), `is_new` is derived from
//! the primary key on every read; the stored flag is only meaningful for
//! collections.

use crate::request::Payload;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState {
    pub is_new: bool,
    pub is_dirty: bool,
    pub is_saving: bool,
    pub is_loaded: bool,
    pub is_error: bool,
    pub errors: Option<Payload>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            is_new: true,
            is_dirty: false,
            is_saving: false,
            is_loaded: false,
            is_error: false,
            errors: None,
        }
    }
}

impl ResourceState {
    /// Applies an observed change. Entities that are neither loaded nor new
    /// (placeholders) absorb nothing. Returns whether the flag flipped.
    pub(crate) fn absorb_change(&mut self, is_new: bool) -> bool {
        if self.is_dirty || !(self.is_loaded || is_new) {
            return false;
        }
        self.is_dirty = true;
        true
    }

    pub(crate) fn record_error(&mut self, payload: Payload) {
        self.is_error = true;
        self.errors = Some(payload);
    }

    pub(crate) fn clear_errors(&mut self) {
        self.is_error = false;
        self.errors = None;
    }

    pub(crate) fn finish_round_trip(&mut self) {
        self.is_saving = false;
        self.is_loaded = true;
    }

    /// Copies the persisted flags of another state; `is_saving` is never copied.
    pub(crate) fn adopt(&mut self, other: &ResourceState) {
        self.is_new = other.is_new;
        self.is_dirty = other.is_dirty;
        self.is_loaded = other.is_loaded;
        self.is_error = other.is_error;
        self.errors = other.errors.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_state() {
        let state = ResourceState::default();
        assert!(state.is_new);
        assert!(!state.is_dirty && !state.is_loaded && !state.is_saving && !state.is_error);
        assert!(state.errors.is_none());
    }

    #[test]
    fn test_absorb_change_gate() {
        let mut placeholder = ResourceState {
            is_new: false,
            ..ResourceState::default()
        };
        assert!(!placeholder.absorb_change(false));
        assert!(!placeholder.is_dirty);

        let mut fresh = ResourceState::default();
        assert!(fresh.absorb_change(true));
        assert!(!fresh.absorb_change(true), "second change is a no-op");

        let mut loaded = ResourceState {
            is_new: false,
            is_loaded: true,
            ..ResourceState::default()
        };
        assert!(loaded.absorb_change(false));
        assert!(loaded.is_dirty);
    }

    #[test]
    fn test_errors_are_recorded_and_cleared() {
        let mut state = ResourceState::default();
        state.record_error(json!({"error": "boom"}));
        assert!(state.is_error);
        assert_eq!(state.errors, Some(json!({"error": "boom"})));

        state.clear_errors();
        assert!(!state.is_error);
        assert!(state.errors.is_none());
    }
}
