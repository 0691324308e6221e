//! The session orchestration core.
//!
//! The dispatcher turns inbound events into responses:
//!
//! - A location event issues a search. The session first records the
//!   search as pending, the upstream call runs without holding the user's
//!   lock, and the result is applied only if no newer search was issued
//!   in the meantime.
//! - Navigation events (pages, selection, back) are pure state
//!   transitions applied atomically through the session store.
//!
//! Failures never escape `handle`: upstream errors become retryable
//! messages, inapplicable events re-send the current view, and a session
//! found violating its invariants is reset to idle.

use crate::config::CoreConfig;
use crate::error::DispatchError;
use crate::event::{EventKind, InboundEvent, Response};
use crate::ranker;
use crate::session::{Session, SessionState};
use crate::store::SessionStore;
use crate::view::Renderer;
use barbot_core::{Location, SearchResult, UserId};
use barbot_integration::{
    MapLinkBuilder, RateLimitResult, RateLimiter, SearchClient, SearchQuery, UpstreamError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Routes inbound events through the session state machine.
pub struct Dispatcher<C> {
    search: C,
    store: Arc<SessionStore>,
    renderer: Renderer,
    limiter: RateLimiter,
    config: CoreConfig,
    upstream_timeout: Duration,
}

impl<C: SearchClient> Dispatcher<C> {
    /// Creates a dispatcher over a shared session store.
    pub fn new(
        search: C,
        maps: MapLinkBuilder,
        store: Arc<SessionStore>,
        config: CoreConfig,
    ) -> Self {
        Self {
            search,
            store,
            renderer: Renderer::new(maps, config.page_size),
            limiter: RateLimiter::new(config.search_rate_limit.clone()),
            upstream_timeout: config.upstream_timeout(),
            config,
        }
    }

    /// Overrides the deadline for upstream calls.
    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Drops expired per-user rate limit windows.
    pub fn prune_rate_limits(&self) -> usize {
        self.limiter.prune_expired()
    }

    /// Handles one inbound event.
    ///
    /// Returns `None` only when the event started a search that was
    /// superseded by a newer location from the same user before it
    /// completed; the newer event produces the response instead.
    #[instrument(
        skip(self, event),
        fields(event_id = %event.id, user_id = %event.user_id, kind = event.kind.name())
    )]
    pub async fn handle(&self, event: InboundEvent) -> Option<Response> {
        let InboundEvent { user_id, kind, .. } = event;
        match kind {
            EventKind::Location { location } => self.search_near(&user_id, location).await,
            kind => Some(
                self.store
                    .update(&user_id, |session| self.navigate(session, kind))
                    .await,
            ),
        }
    }

    async fn search_near(&self, user_id: &UserId, location: Location) -> Option<Response> {
        if !location.is_valid() {
            debug!(%location, "ignoring out of range location");
            return Some(
                self.store
                    .update(user_id, |session| {
                        session.touch();
                        self.settle(session, Err(DispatchError::InvalidEvent {
                            reason: "location out of range".to_string(),
                        }))
                    })
                    .await,
            );
        }

        match self.limiter.check_and_increment(user_id.as_str()) {
            RateLimitResult::Allowed { remaining } => debug!(remaining, "search allowed"),
            limit @ RateLimitResult::Exceeded { .. } => {
                let err = UpstreamError::Unavailable {
                    reason: "search rate limit exceeded".to_string(),
                    retry_after_secs: limit.retry_after_secs(),
                };
                warn!(error = %err, "search throttled");
                return Some(
                    self.store
                        .update(user_id, |session| {
                            // This location supersedes any search in flight.
                            session.touch();
                            session.cancel_search();
                            self.renderer.upstream_error(&err)
                        })
                        .await,
                );
            }
        }

        let query = SearchQuery::new(
            location,
            self.config.search_radius_default,
            self.config.categories.clone(),
        )
        .with_limit(self.config.result_limit);
        let search_id = query.id;

        self.store
            .update(user_id, |session| {
                session.touch();
                session.begin_search(search_id);
            })
            .await;

        let outcome = match tokio::time::timeout(self.upstream_timeout, self.search.search(&query))
            .await
        {
            Ok(Ok(result)) if result.is_empty() => {
                Err(UpstreamError::bad_response("no bars in response"))
            }
            Ok(outcome) => outcome,
            Err(_) => Err(UpstreamError::timed_out()),
        };

        self.store
            .update(user_id, |session| {
                if !session.is_pending(search_id) {
                    debug!(%search_id, "discarding superseded search");
                    return None;
                }

                match outcome {
                    Ok(result) => {
                        let ranked = SearchResult {
                            id: search_id,
                            bars: ranker::rank(result.bars),
                            ..result
                        };
                        info!(%search_id, bars = ranked.len(), "search applied");
                        session.apply_result(ranked);
                        let view = self.current_view(session);
                        Some(self.settle(session, view))
                    }
                    Err(e) => {
                        warn!(%search_id, error = %e, "search failed");
                        session.abandon_search(search_id);
                        Some(self.renderer.upstream_error(&e))
                    }
                }
            })
            .await
    }

    /// Applies a navigation event to the session.
    fn navigate(&self, session: &mut Session, kind: EventKind) -> Response {
        session.touch();
        if let Err(e) = session.validate(self.config.page_size) {
            return self.settle(session, Err(e.into()));
        }

        let outcome = match kind {
            EventKind::Start => Ok(self.renderer.welcome()),
            EventKind::Help => Ok(self.renderer.help()),
            EventKind::NextPage => self.turn_page(session, true),
            EventKind::PrevPage => self.turn_page(session, false),
            EventKind::SelectBar { bar_id } => self.select_bar(session, bar_id),
            EventKind::Back => self.back(session),
            EventKind::Location { .. } => Err(DispatchError::InvalidEvent {
                reason: "location events start a search".to_string(),
            }),
        };
        self.settle(session, outcome)
    }

    /// Resolves a transition outcome into the response to send.
    fn settle(&self, session: &mut Session, outcome: Result<Response, DispatchError>) -> Response {
        let outcome = outcome.and_then(|response| {
            session.validate(self.config.page_size)?;
            Ok(response)
        });

        match outcome {
            Ok(response) => response,
            Err(DispatchError::InvalidEvent { reason }) => {
                debug!(%reason, "ignoring event, re-sending current view");
                match self.current_view(session) {
                    Ok(response) => response,
                    Err(e) => self.reset(session, &e),
                }
            }
            Err(DispatchError::Upstream(e)) => self.renderer.upstream_error(&e),
            Err(e @ DispatchError::SessionCorrupted { .. }) => self.reset(session, &e),
        }
    }

    fn reset(&self, session: &mut Session, cause: &DispatchError) -> Response {
        error!(error = %cause, "resetting corrupted session");
        session.reset();
        self.renderer.session_reset()
    }

    /// Renders whatever the session currently shows.
    fn current_view(&self, session: &Session) -> Result<Response, DispatchError> {
        match session.state() {
            SessionState::Idle => Ok(self.renderer.idle()),
            SessionState::Browsing => self.page_view(session),
            SessionState::Detail => session
                .selected_bar()
                .map(|bar| self.renderer.detail(bar))
                .ok_or_else(|| DispatchError::SessionCorrupted {
                    reason: "selected bar missing from result".to_string(),
                }),
        }
    }

    fn page_view(&self, session: &Session) -> Result<Response, DispatchError> {
        let result = session
            .current_result
            .as_ref()
            .ok_or_else(|| DispatchError::InvalidEvent {
                reason: "no search results yet".to_string(),
            })?;
        self.renderer
            .page(result, session.page_index)
            .map_err(|e| DispatchError::SessionCorrupted {
                reason: e.to_string(),
            })
    }

    fn turn_page(&self, session: &mut Session, forward: bool) -> Result<Response, DispatchError> {
        if session.state() != SessionState::Browsing {
            return Err(DispatchError::InvalidEvent {
                reason: "paging is only possible while browsing".to_string(),
            });
        }

        let last = ranker::last_page(session.result_len(), self.config.page_size);
        session.page_index = if forward {
            (session.page_index + 1).min(last)
        } else {
            session.page_index.saturating_sub(1)
        };
        self.page_view(session)
    }

    fn select_bar(&self, session: &mut Session, bar_id: String) -> Result<Response, DispatchError> {
        let Some(result) = &session.current_result else {
            return Err(DispatchError::InvalidEvent {
                reason: "no search results yet".to_string(),
            });
        };
        if !result.contains(&bar_id) {
            return Err(DispatchError::InvalidEvent {
                reason: format!("bar '{bar_id}' is not in the current result"),
            });
        }

        session.selected_bar_id = Some(bar_id);
        self.current_view(session)
    }

    fn back(&self, session: &mut Session) -> Result<Response, DispatchError> {
        if session.state() != SessionState::Detail {
            return Err(DispatchError::InvalidEvent {
                reason: "nothing to go back from".to_string(),
            });
        }

        session.selected_bar_id = None;
        self.page_view(session)
    }
}
