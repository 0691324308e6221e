//! Process-wide session registry.
//!
//! Each user's session sits behind its own async mutex, so events for the
//! same user are serialized while events for different users proceed
//! independently. The map of users is guarded by a plain mutex that is
//! only held for lookups, never across an `.await`.

use crate::session::Session;
use barbot_core::UserId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type SessionSlot = Arc<tokio::sync::Mutex<Session>>;

/// Registry of live sessions keyed by user.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, SessionSlot>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<UserId, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, user_id: &UserId) -> SessionSlot {
        let mut sessions = self.map();
        Arc::clone(sessions.entry(user_id.clone()).or_insert_with(|| {
            debug!(user_id = %user_id, "creating session");
            Arc::new(tokio::sync::Mutex::new(Session::new(user_id.clone())))
        }))
    }

    /// Returns a snapshot of the user's session, creating it if absent.
    pub async fn get_or_create(&self, user_id: &UserId) -> Session {
        let slot = self.slot(user_id);
        let session = slot.lock().await;
        session.clone()
    }

    /// Applies `mutator` to the user's session while holding that user's
    /// lock, creating the session if absent.
    ///
    /// Concurrent updates for the same user run one after another in the
    /// order they acquired the lock.
    pub async fn update<F, R>(&self, user_id: &UserId, mutator: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let slot = self.slot(user_id);
        let mut session = slot.lock().await;
        mutator(&mut session)
    }

    /// Removes sessions whose last activity is older than `older_than`.
    ///
    /// Sessions currently borrowed by an update are kept. Returns the number
    /// of sessions removed.
    pub fn evict_idle(&self, older_than: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            return 0;
        };

        let mut sessions = self.map();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            // Slots are only cloned under the map lock, so a count of one
            // means no update holds or awaits this session.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => session.last_activity >= cutoff,
                Err(_) => true,
            }
        });
        before - sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Spawns a task that evicts idle sessions every `interval`.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        idle_timeout: Duration,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(idle_timeout);
                if evicted > 0 {
                    info!(evicted, remaining = store.len(), "evicted idle sessions");
                }
            }
        })
    }
}
