//! Daily X client SDK.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything a Daily X front end needs short of drawing pixels: the session
//! store that owns "who is signed in", the route guard derived from it, the
//! Google OAuth bridge, typed wrappers for the auth and expense endpoints,
//! and the form/date helpers the screens share.
//!
//! The session store is an explicit object. Front ends build one, call
//! [`SessionStore::init`] at startup, and hand clones of it to whatever
//! needs to read or change the session.

pub mod config;
pub mod net;
pub mod oauth;
pub mod state;
pub mod util;

pub use config::ClientConfig;
pub use net::auth_api::{AuthApi, Credentials, HttpAuthApi};
pub use net::error::ApiError;
pub use net::expense_api::ExpenseApi;
pub use net::types::{AuthType, User};
pub use oauth::{OAuthCompletion, OAuthOutcome};
pub use state::guard::{GuardState, Route, RouteDecision, RouteGuard};
pub use state::session::{Session, SessionError, SessionStore};
pub use util::persistence::{FileStore, KeyValueStore, MemoryStore};
