use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::models::SessionModel;

/// Per-request view of the caller's session.
///
/// Cloned into request extensions by the session layer; every clone shares
/// the same state, so writes made by a handler are visible to the layer when
/// it persists the session after the handler returns.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

struct SessionState {
    model: SessionModel,
    is_new: bool,
    modified: bool,
}

impl Session {
    /// A session not yet backed by a stored record
    pub fn fresh(expiration_days: i64) -> Self {
        Self::from_state(SessionModel::new(expiration_days), true)
    }

    /// A session loaded from the repository
    pub fn loaded(model: SessionModel) -> Self {
        Self::from_state(model, false)
    }

    fn from_state(model: SessionModel, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                model,
                is_new,
                modified: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> String {
        self.lock().model.id.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().model.values.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.lock();
        state.model.values.insert(key.into(), value.into());
        state.modified = true;
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        let removed = state.model.values.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    pub fn is_new(&self) -> bool {
        self.lock().is_new
    }

    /// Copy of the record as it should be written back
    pub(crate) fn snapshot(&self) -> SessionModel {
        self.lock().model.clone()
    }

    /// Marks the current state as persisted
    pub(crate) fn mark_saved(&self) {
        let mut state = self.lock();
        state.is_new = false;
        state.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_marks_modified_across_clones() {
        let session = Session::fresh(7);
        let handler_view = session.clone();
        assert!(!session.is_modified());

        handler_view.set("user_name", "admin");

        assert!(session.is_modified());
        assert_eq!(session.get("user_name"), Some(json!("admin")));
    }

    #[test]
    fn test_remove_missing_key_is_not_a_change() {
        let session = Session::loaded(SessionModel::new(7));
        assert_eq!(session.remove("missing"), None);
        assert!(!session.is_modified());
    }

    #[test]
    fn test_mark_saved_resets_flags() {
        let session = Session::fresh(7);
        session.set("k", 1);
        assert!(session.is_new());

        session.mark_saved();
        assert!(!session.is_new());
        assert!(!session.is_modified());
        assert_eq!(session.snapshot().values.get("k"), Some(&json!(1)));
    }
}
