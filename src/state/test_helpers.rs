//! Mock auth backends and fixtures shared by the state, oauth and net tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use super::session::SessionStore;
use crate::net::auth_api::{AuthApi, Credentials};
use crate::net::error::ApiError;
use crate::net::types::{AuthType, TokenGrant, User};
use crate::util::persistence::{KeyValueStore, MemoryStore, StorageError};

#[must_use]
pub fn user(name: &str, email: &str) -> User {
    User { email: email.into(), name: name.into(), image_url: None, auth_type: Some(AuthType::Basic) }
}

#[must_use]
pub fn grant(name: &str, email: &str, token: &str) -> TokenGrant {
    TokenGrant { user: user(name, email), auth_token: token.into() }
}

/// What a mock backend was asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Basic { email: String, password: String },
    Google { access_token: String },
    Register { name: String, email: String },
}

impl Call {
    fn of(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Basic { email, password } => Self::Basic { email: email.clone(), password: password.clone() },
            Credentials::GoogleOAuth { access_token } => Self::Google { access_token: access_token.clone() },
        }
    }
}

// =========================================================================
// ScriptedAuthApi
// =========================================================================

/// Answers calls in order from a script. Runs dry with a network error.
pub struct ScriptedAuthApi {
    responses: Mutex<VecDeque<Result<TokenGrant, ApiError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedAuthApi {
    #[must_use]
    pub fn new(responses: Vec<Result<TokenGrant, ApiError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: Call) -> Result<TokenGrant, ApiError> {
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("script exhausted".into())))
    }
}

#[async_trait]
impl AuthApi for ScriptedAuthApi {
    async fn request_token(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        self.answer(Call::of(credentials))
    }

    async fn register(&self, name: &str, email: &str, _password: &str) -> Result<TokenGrant, ApiError> {
        self.answer(Call::Register { name: name.into(), email: email.into() })
    }
}

// =========================================================================
// GatedAuthApi
// =========================================================================

/// Each call parks until the test resolves its gate, so tests control the
/// order in which overlapping exchanges settle.
pub struct GatedAuthApi {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<TokenGrant, ApiError>>>>,
    started: watch::Sender<usize>,
}

impl GatedAuthApi {
    /// Mock with `n` gates; the senders resolve calls in arrival order.
    #[must_use]
    pub fn new(n: usize) -> (Self, Vec<oneshot::Sender<Result<TokenGrant, ApiError>>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) = (0..n).map(|_| oneshot::channel()).unzip();
        let (started, _) = watch::channel(0);
        (Self { gates: Mutex::new(receivers), started }, senders)
    }

    /// Wait until at least `n` calls have reached the backend.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|count| *count >= n).await.unwrap();
    }

    async fn park(&self) -> Result<TokenGrant, ApiError> {
        let gate = self.gates.lock().unwrap().pop_front();
        self.started.send_modify(|count| *count += 1);
        match gate {
            Some(gate) => gate.await.unwrap_or_else(|_| Err(ApiError::Network("gate dropped".into()))),
            None => Err(ApiError::Network("no gate left".into())),
        }
    }
}

#[async_trait]
impl AuthApi for GatedAuthApi {
    async fn request_token(&self, _credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        self.park().await
    }

    async fn register(&self, _name: &str, _email: &str, _password: &str) -> Result<TokenGrant, ApiError> {
        self.park().await
    }
}

// =========================================================================
// FailingStore
// =========================================================================

/// Storage whose every operation fails with an I/O error.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(std::io::Error::other("disk unplugged").into())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(std::io::Error::other("disk unplugged").into())
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(std::io::Error::other("disk unplugged").into())
    }
}

// =========================================================================
// GatedStore
// =========================================================================

/// Memory storage whose reads park until [`GatedStore::release`], so tests
/// can act while the startup restore is still reading.
pub struct GatedStore {
    inner: MemoryStore,
    open: watch::Sender<bool>,
    reads: watch::Sender<usize>,
}

impl GatedStore {
    #[must_use]
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, open: watch::channel(false).0, reads: watch::channel(0).0 }
    }

    /// Wait until at least `n` reads are parked or done.
    pub async fn wait_for_reads(&self, n: usize) {
        self.reads.subscribe().wait_for(|count| *count >= n).await.unwrap();
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut open = self.open.subscribe();
        self.reads.send_modify(|count| *count += 1);
        open.wait_for(|open| *open).await.unwrap();
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

// =========================================================================
// stores
// =========================================================================

/// Hydrated, signed-out store over fresh memory storage.
pub async fn ready_store(api: Arc<dyn AuthApi>) -> (SessionStore, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let store = SessionStore::new(api, storage.clone());
    store.init().await;
    (store, storage)
}

/// Hydrated store already signed in as Ann with token `T1`; the backend is
/// never called.
pub async fn signed_in_store() -> SessionStore {
    let (store, _) = ready_store(Arc::new(ScriptedAuthApi::new(Vec::new()))).await;
    store.set_user_and_token(user("Ann", "a@x.com"), "T1".into()).await.unwrap();
    store
}
