//! Conversation core for barbot.
//!
//! This crate provides:
//!
//! - **Dispatcher**: Routes inbound chat events through the per-user state
//!   machine and renders responses
//! - **Session Store**: Process-wide registry of per-user sessions
//! - **Ranker**: Ordering and pagination of search results

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ranker;
pub mod session;
pub mod store;
pub mod view;

pub use config::CoreConfig;
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, DispatchError, PageError, SessionError};
pub use event::{Action, EventKind, InboundEvent, MenuItem, Response};
pub use session::{Session, SessionState};
pub use store::SessionStore;
pub use view::Renderer;
