//! Session store: the single owner of "who is signed in".
//!
//! SYSTEM CONTEXT
//! ==============
//! Front ends create one [`SessionStore`], call [`SessionStore::init`] at
//! startup and pass clones to whatever reads or changes the session. The
//! route guard and the expense client only read; every mutation goes through
//! the operations below.
//!
//! DESIGN
//! ======
//! User and token live together in one `Option`, so "authenticated" is a
//! property of the type rather than a flag to keep in sync. State is
//! published through a `watch` channel; mutations and their persistence
//! writes run under one async gate so writes reach storage in commit order.
//!
//! TRADE-OFFS
//! ==========
//! Overlapping credential exchanges resolve by latest invocation: each one
//! takes a ticket from a generation counter when it starts, and a result is
//! committed only if no newer sign-in, sign-out or direct set happened in
//! the meantime. In-flight HTTP requests are not cancelled; their results
//! are dropped at commit time.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::net::auth_api::{AuthApi, Credentials};
use crate::net::error::ApiError;
use crate::net::types::{TokenGrant, User};
use crate::util::persistence::{KeyValueStore, StorageError, load_json, save_json};

/// Storage key of the persisted session document.
pub const STORAGE_KEY: &str = "auth-storage";
const STORAGE_VERSION: u32 = 0;

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
struct SignedIn {
    user: User,
    token: String,
}

/// Snapshot of the authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    signed_in: Option<SignedIn>,
    is_loading: bool,
    hydrated: bool,
}

impl Session {
    fn restoring() -> Self {
        Self { signed_in: None, is_loading: true, hydrated: false }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.signed_in.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.signed_in.as_ref().map(|s| s.token.as_str())
    }

    /// True iff both a user and a token are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.signed_in.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the startup restore has finished.
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }
}

/// The part of [`Session`] that survives restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl PersistedSession {
    fn of(session: &Session) -> Self {
        Self {
            user: session.user().cloned(),
            token: session.token().map(str::to_owned),
            is_authenticated: session.is_authenticated(),
        }
    }

    fn into_signed_in(self) -> Result<Option<SignedIn>, SessionError> {
        match (self.user, self.token, self.is_authenticated) {
            (Some(user), Some(token), true) if !token.is_empty() => Ok(Some(SignedIn { user, token })),
            (None, None, false) => Ok(None),
            (user, token, flag) => Err(SessionError::InvariantViolation(format!(
                "persisted session has user={} token={} isAuthenticated={flag}",
                user.is_some(),
                token.is_some_and(|t| !t.is_empty()),
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEnvelope {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The auth API call failed; session state is unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A newer sign-in, sign-out or direct set started before this call
    /// settled; its result was discarded.
    #[error("superseded by a newer session change")]
    Superseded,

    /// User and token would have diverged.
    #[error("session invariant violated: {0}")]
    InvariantViolation(String),
}

// =============================================================================
// STORE
// =============================================================================

/// Shared handle to the session. Cloning is cheap and every clone sees the
/// same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<Session>,
    write_gate: Mutex<()>,
    generation: AtomicU64,
    /// Bumped under the write gate whenever user and token are replaced.
    identity_commits: AtomicU64,
}

impl SessionStore {
    /// Create a store in the restoring phase. Nothing is read until
    /// [`SessionStore::init`] runs.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(Session::restoring());
        Self {
            inner: Arc::new(Inner {
                api,
                storage,
                state,
                write_gate: Mutex::new(()),
                generation: AtomicU64::new(0),
                identity_commits: AtomicU64::new(0),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // lifecycle
    // -------------------------------------------------------------------------

    /// App-start event: restore the persisted session, then leave the
    /// restoring phase. Never fails; unreadable or inconsistent storage
    /// starts the app signed out.
    pub async fn init(&self) -> Session {
        let seen = self.inner.identity_commits.load(Ordering::SeqCst);
        let restored = self.restore().await;

        let _gate = self.inner.write_gate.lock().await;
        // A sign-in, sign-out or direct set that committed while storage was
        // being read wins; attempts that failed leave the restored session.
        let apply = self.inner.identity_commits.load(Ordering::SeqCst) == seen;
        self.inner.state.send_modify(|s| {
            if apply {
                s.signed_in = restored;
            }
            s.is_loading = false;
            s.hydrated = true;
        });
        let session = self.snapshot();
        tracing::info!(authenticated = session.is_authenticated(), "session restored");
        session
    }

    /// Drop any in-flight exchange and flush the persisted session one last
    /// time.
    pub async fn teardown(&self) {
        self.advance();
        let _gate = self.inner.write_gate.lock().await;
        self.persist_locked().await;
        tracing::debug!("session store torn down");
    }

    // -------------------------------------------------------------------------
    // operations
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Propagates the auth API failure, or [`SessionError::Superseded`] when
    /// a newer session change started first.
    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let ticket = self.advance();
        let credentials = Credentials::Basic { email: email.to_owned(), password: password.to_owned() };
        let grant = self.inner.api.request_token(&credentials).await.inspect_err(|e| {
            tracing::warn!(email = %email, error = %e, "email sign-in failed");
        })?;
        self.commit_grant(ticket, grant).await
    }

    /// # Errors
    ///
    /// Same as [`SessionStore::sign_in_with_email`].
    pub async fn sign_up_with_email(&self, name: &str, email: &str, password: &str) -> Result<User, SessionError> {
        let ticket = self.advance();
        let grant = self.inner.api.register(name, email, password).await.inspect_err(|e| {
            tracing::warn!(email = %email, error = %e, "email sign-up failed");
        })?;
        self.commit_grant(ticket, grant).await
    }

    /// Exchange a Google access token for an application session.
    ///
    /// # Errors
    ///
    /// Same as [`SessionStore::sign_in_with_email`].
    pub async fn sign_in_with_google(&self, access_token: &str) -> Result<User, SessionError> {
        let ticket = self.advance();
        let credentials = Credentials::GoogleOAuth { access_token: access_token.to_owned() };
        let grant = self.inner.api.request_token(&credentials).await.inspect_err(|e| {
            tracing::warn!(error = %e, "google sign-in failed");
        })?;
        self.commit_grant(ticket, grant).await
    }

    /// Clear user and token together. Always succeeds; nothing is revoked
    /// remotely.
    pub async fn sign_out(&self) {
        self.advance();
        self.commit_identity(|s| {
            s.signed_in = None;
            s.is_loading = false;
        })
        .await;
        tracing::info!("signed out");
    }

    /// Install a user and token obtained elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvariantViolation`] for an empty token.
    pub async fn set_user_and_token(&self, user: User, token: String) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::InvariantViolation("empty session token".into()));
        }
        self.advance();
        self.commit_identity(|s| s.signed_in = Some(SignedIn { user, token })).await;
        Ok(())
    }

    pub async fn set_loading(&self, is_loading: bool) {
        self.commit(|s| s.is_loading = is_loading).await;
    }

    // -------------------------------------------------------------------------
    // readers
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_owned)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Receiver notified on every committed change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    /// Start a new session change, superseding every older one.
    fn advance(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn commit_grant(&self, ticket: u64, grant: TokenGrant) -> Result<User, SessionError> {
        if grant.auth_token.is_empty() {
            return Err(SessionError::InvariantViolation("auth API returned an empty token".into()));
        }
        let _gate = self.inner.write_gate.lock().await;
        if self.inner.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!(email = %grant.user.email, "discarding superseded sign-in result");
            return Err(SessionError::Superseded);
        }
        let user = grant.user.clone();
        self.inner.identity_commits.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_modify(|s| {
            s.signed_in = Some(SignedIn { user: grant.user, token: grant.auth_token });
            s.is_loading = false;
        });
        self.persist_locked().await;
        tracing::info!(email = %user.email, "signed in");
        Ok(user)
    }

    async fn commit(&self, mutate: impl FnOnce(&mut Session) + Send) {
        let _gate = self.inner.write_gate.lock().await;
        self.inner.state.send_modify(mutate);
        self.persist_locked().await;
    }

    async fn commit_identity(&self, mutate: impl FnOnce(&mut Session) + Send) {
        let _gate = self.inner.write_gate.lock().await;
        self.inner.identity_commits.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_modify(mutate);
        self.persist_locked().await;
    }

    /// Write the persisted projection. Callers hold the write gate.
    ///
    /// Until the restore finishes the in-memory identity is only
    /// authoritative once something committed one; otherwise the stored
    /// document is left alone.
    async fn persist_locked(&self) {
        if !self.inner.state.borrow().is_hydrated() && self.inner.identity_commits.load(Ordering::SeqCst) == 0 {
            return;
        }
        let envelope = StoredEnvelope { state: PersistedSession::of(&self.inner.state.borrow()), version: STORAGE_VERSION };
        if let Err(e) = save_json(self.inner.storage.as_ref(), STORAGE_KEY, &envelope).await {
            tracing::warn!(error = %e, "failed to persist session; keeping in-memory state");
        }
    }

    async fn restore(&self) -> Option<SignedIn> {
        let storage = self.inner.storage.as_ref();
        let envelope = match load_json::<StoredEnvelope>(storage, STORAGE_KEY).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                tracing::debug!("no persisted session");
                return None;
            }
            Err(StorageError::Encoding(e)) => {
                tracing::warn!(error = %e, "discarding unreadable persisted session");
                self.discard_persisted().await;
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "session storage unavailable; starting signed out");
                return None;
            }
        };
        match envelope.state.into_signed_in() {
            Ok(signed_in) => signed_in,
            Err(e) => {
                tracing::warn!(error = %e, "discarding inconsistent persisted session");
                self.discard_persisted().await;
                None
            }
        }
    }

    async fn discard_persisted(&self) {
        if let Err(e) = self.inner.storage.remove(STORAGE_KEY).await {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
    }
}
