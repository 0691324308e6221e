//! Per-user navigation sessions.
//!
//! A session remembers the user's latest search and where they are in it.
//! Its state (idle, browsing, detail) is derived from the fields rather
//! than stored, so it can never disagree with them.

use crate::error::SessionError;
use crate::ranker;
use barbot_core::{Bar, SearchId, SearchResult, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The navigation state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No search results yet.
    Idle,
    /// Paging through results.
    Browsing,
    /// Looking at one bar.
    Detail,
}

/// A user's navigation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The user who owns this session.
    pub user_id: UserId,
    /// The latest applied search, ranked.
    pub current_result: Option<SearchResult>,
    /// The bar shown in the detail view.
    pub selected_bar_id: Option<String>,
    /// Zero-based page within `current_result`.
    pub page_index: usize,
    /// When the user last sent an event.
    pub last_activity: DateTime<Utc>,
    /// The newest search issued for this user that has not resolved yet.
    pub pending_search: Option<SearchId>,
}

impl Session {
    /// Creates an idle session for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            current_result: None,
            selected_bar_id: None,
            page_index: 0,
            last_activity: Utc::now(),
            pending_search: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.current_result, &self.selected_bar_id) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::Browsing,
            (Some(_), Some(_)) => SessionState::Detail,
        }
    }

    /// Records user activity.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Registers `id` as the newest search; older in-flight searches are
    /// superseded from now on.
    pub fn begin_search(&mut self, id: SearchId) {
        self.pending_search = Some(id);
    }

    /// Returns true if `id` is the newest search issued for this session.
    #[must_use]
    pub fn is_pending(&self, id: SearchId) -> bool {
        self.pending_search == Some(id)
    }

    /// Ends the pending search without applying a result.
    pub fn abandon_search(&mut self, id: SearchId) {
        if self.is_pending(id) {
            self.pending_search = None;
        }
    }

    /// Drops the pending search, whichever generation it is.
    pub fn cancel_search(&mut self) {
        self.pending_search = None;
    }

    /// Replaces the current result with a fresh, already ranked, one.
    pub fn apply_result(&mut self, result: SearchResult) {
        self.abandon_search(result.id);
        self.current_result = Some(result);
        self.selected_bar_id = None;
        self.page_index = 0;
    }

    /// Drops all navigation state, returning to idle.
    pub fn reset(&mut self) {
        self.current_result = None;
        self.selected_bar_id = None;
        self.page_index = 0;
        self.pending_search = None;
    }

    /// Number of bars in the current result.
    #[must_use]
    pub fn result_len(&self) -> usize {
        self.current_result.as_ref().map_or(0, SearchResult::len)
    }

    /// Returns the selected bar, if any.
    #[must_use]
    pub fn selected_bar(&self) -> Option<&Bar> {
        let id = self.selected_bar_id.as_deref()?;
        self.current_result.as_ref()?.bar(id)
    }

    /// Checks the session invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Corrupted`] describing the first violation.
    pub fn validate(&self, page_size: usize) -> Result<(), SessionError> {
        let len = self.result_len();
        let Some(result) = &self.current_result else {
            if self.selected_bar_id.is_some() {
                return Err(corrupted("selection without a search result"));
            }
            if self.page_index != 0 {
                return Err(corrupted("page index without a search result"));
            }
            return Ok(());
        };

        if self.page_index > ranker::last_page(len, page_size) {
            return Err(corrupted(format!(
                "page {} out of range for {len} results",
                self.page_index
            )));
        }
        if let Some(id) = &self.selected_bar_id
            && !result.contains(id)
        {
            return Err(corrupted(format!("selected bar '{id}' not in result")));
        }
        Ok(())
    }
}

fn corrupted(reason: impl Into<String>) -> SessionError {
    SessionError::Corrupted {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbot_core::Location;
    use std::collections::BTreeSet;

    fn result_with(ids: &[&str]) -> SearchResult {
        let bars = ids
            .iter()
            .map(|id| Bar {
                id: (*id).to_string(),
                name: (*id).to_string(),
                coordinates: Location::new(1.0, 1.0),
                rating: 4.0,
                distance_meters: 1.0,
                address: String::new(),
                phone: None,
                categories: BTreeSet::new(),
            })
            .collect();
        SearchResult::new(SearchId::new(), Location::new(1.0, 1.0), bars)
    }

    #[test]
    fn new_session_is_idle() {
        let session = Session::new(UserId::new("1"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.validate(6).is_ok());
    }

    #[test]
    fn state_follows_fields() {
        let mut session = Session::new(UserId::new("1"));
        session.apply_result(result_with(&["a", "b"]));
        assert_eq!(session.state(), SessionState::Browsing);

        session.selected_bar_id = Some("b".to_string());
        assert_eq!(session.state(), SessionState::Detail);
        assert_eq!(session.selected_bar().map(|b| b.id.as_str()), Some("b"));

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn pending_search_tracks_newest_generation() {
        let mut session = Session::new(UserId::new("1"));
        let older = SearchId::new();
        let newer = SearchId::new();

        session.begin_search(older);
        session.begin_search(newer);
        assert!(!session.is_pending(older));
        assert!(session.is_pending(newer));

        session.abandon_search(older);
        assert!(session.is_pending(newer));
        session.abandon_search(newer);
        assert_eq!(session.pending_search, None);
    }

    #[test]
    fn cancel_search_drops_any_generation() {
        let mut session = Session::new(UserId::new("1"));
        let id = SearchId::new();
        session.begin_search(id);

        session.cancel_search();

        assert!(!session.is_pending(id));
        assert_eq!(session.pending_search, None);
    }

    #[test]
    fn apply_result_resets_navigation() {
        let mut session = Session::new(UserId::new("1"));
        session.apply_result(result_with(&["a"]));
        session.selected_bar_id = Some("a".to_string());

        let fresh = result_with(&["x", "y"]);
        session.begin_search(fresh.id);
        session.apply_result(fresh);

        assert_eq!(session.selected_bar_id, None);
        assert_eq!(session.page_index, 0);
        assert_eq!(session.pending_search, None);
        assert_eq!(session.result_len(), 2);
    }

    #[test]
    fn validate_detects_selection_without_result() {
        let mut session = Session::new(UserId::new("1"));
        session.selected_bar_id = Some("a".to_string());
        assert!(session.validate(6).is_err());
    }

    #[test]
    fn validate_detects_page_out_of_range() {
        let mut session = Session::new(UserId::new("1"));
        session.apply_result(result_with(&["a", "b", "c"]));
        session.page_index = 1;
        assert!(session.validate(2).is_ok());
        assert!(session.validate(3).is_err());
    }

    #[test]
    fn validate_detects_unknown_selection() {
        let mut session = Session::new(UserId::new("1"));
        session.apply_result(result_with(&["a"]));
        session.selected_bar_id = Some("zzz".to_string());
        let err = session.validate(6).unwrap_err();
        assert!(err.to_string().contains("zzz"));
    }
}
