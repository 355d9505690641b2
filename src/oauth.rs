//! Google OAuth: consent URL, redirect parsing and session completion.
//!
//! ARCHITECTURE
//! ============
//! The consent screen runs outside the app (system browser or webview). The
//! app builds the authorization URL, the provider redirects back to
//! `redirect_uri` with the result in the URL fragment, and
//! [`OAuthCompletion::complete`] turns that result into a session by
//! exchanging the provider access token with the backend.
//!
//! Only a successful consent on a signed-out store reaches the network; a
//! repeated callback after sign-in is ignored.

#[cfg(test)]
#[path = "oauth_test.rs"]
mod oauth_test;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use reqwest::Url;

use crate::net::types::User;
use crate::state::session::{SessionError, SessionStore};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_SCOPES: &str = "openid profile email";

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("no Google client id configured for {0}")]
    MissingClientId(Platform),
    #[error("unknown platform '{0}' (expected android, ios or web)")]
    UnknownPlatform(String),
    #[error("invalid OAuth URL: {0}")]
    InvalidUrl(String),
}

/// Platform whose OAuth client id is used for the consent request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
        })
    }
}

impl FromStr for Platform {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "web" => Ok(Self::Web),
            _ => Err(OAuthError::UnknownPlatform(s.to_owned())),
        }
    }
}

/// Per-platform Google client ids plus the app's redirect target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoogleOAuthConfig {
    pub android_client_id: Option<String>,
    pub ios_client_id: Option<String>,
    pub web_client_id: Option<String>,
    pub redirect_uri: String,
}

/// A consent request ready to open, with the anti-forgery state to check on
/// the way back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthRequest {
    pub url: Url,
    pub state: String,
}

impl GoogleOAuthConfig {
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingClientId`] when `platform` has no id.
    pub fn client_id(&self, platform: Platform) -> Result<&str, OAuthError> {
        let id = match platform {
            Platform::Android => &self.android_client_id,
            Platform::Ios => &self.ios_client_id,
            Platform::Web => &self.web_client_id,
        };
        id.as_deref().filter(|id| !id.is_empty()).ok_or(OAuthError::MissingClientId(platform))
    }

    /// Build an implicit-grant consent URL that asks the user to pick an
    /// account.
    ///
    /// # Errors
    ///
    /// Fails when the platform has no client id.
    pub fn authorization_request(&self, platform: Platform) -> Result<OAuthRequest, OAuthError> {
        let client_id = self.client_id(platform)?;
        let state = generate_state();
        let url = Url::parse_with_params(GOOGLE_AUTH_URL, &[
            ("client_id", client_id),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "token"),
            ("scope", GOOGLE_SCOPES),
            ("prompt", "select_account"),
            ("state", state.as_str()),
        ])
        .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;
        Ok(OAuthRequest { url, state })
    }
}

fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =============================================================================
// REDIRECT
// =============================================================================

/// Result of the browser consent flow.
#[derive(Clone, PartialEq, Eq)]
pub enum OAuthOutcome {
    Success { access_token: String },
    Cancelled,
    Error(String),
}

impl fmt::Debug for OAuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { .. } => f.write_str("Success { .. }"),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Error(message) => f.debug_tuple("Error").field(message).finish(),
        }
    }
}

/// Read the consent result out of the redirect URL.
///
/// Parameters come from the fragment (implicit grant), falling back to the
/// query string. When `expected_state` is given the `state` parameter must
/// match it.
#[must_use]
pub fn parse_redirect(redirect: &str, expected_state: Option<&str>) -> OAuthOutcome {
    let Ok(url) = Url::parse(redirect.trim()) else {
        return OAuthOutcome::Error("malformed redirect URL".into());
    };
    let params = redirect_params(&url);

    if let Some(error) = params.get("error") {
        if error == "access_denied" {
            return OAuthOutcome::Cancelled;
        }
        return OAuthOutcome::Error(match params.get("error_description") {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        });
    }
    if params.is_empty() {
        return OAuthOutcome::Cancelled;
    }
    if let Some(expected) = expected_state {
        if params.get("state").map(String::as_str) != Some(expected) {
            return OAuthOutcome::Error("OAuth state mismatch".into());
        }
    }
    match params.get("access_token") {
        Some(token) if !token.is_empty() => OAuthOutcome::Success { access_token: token.clone() },
        _ => OAuthOutcome::Error("redirect carried no access token".into()),
    }
}

fn redirect_params(url: &Url) -> HashMap<String, String> {
    let raw = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => fragment,
        _ => url.query().unwrap_or_default(),
    };
    // Decode through a throwaway URL so fragment and query share one
    // form-urlencoded parser.
    let mut probe = url.clone();
    probe.set_fragment(None);
    probe.set_query(Some(raw));
    probe.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

// =============================================================================
// COMPLETION
// =============================================================================

/// How an OAuth callback ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionStatus {
    SignedIn(User),
    /// The store was already signed in; the callback was ignored.
    AlreadyAuthenticated,
    Cancelled,
    /// The provider reported an error; nothing was exchanged.
    Denied(String),
}

/// Bridges consent outcomes into the session store.
#[derive(Clone)]
pub struct OAuthCompletion {
    store: SessionStore,
}

impl OAuthCompletion {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Mark the store busy while the consent screen is open.
    pub async fn begin(&self) {
        self.store.set_loading(true).await;
    }

    /// Oauth-callback-received event. Loading is cleared on every path.
    ///
    /// # Errors
    ///
    /// Propagates a failed token exchange after clearing loading.
    pub async fn complete(&self, outcome: OAuthOutcome) -> Result<CompletionStatus, SessionError> {
        let result = match outcome {
            OAuthOutcome::Success { .. } if self.store.is_authenticated() => {
                tracing::debug!("ignoring OAuth callback for an authenticated session");
                Ok(CompletionStatus::AlreadyAuthenticated)
            }
            OAuthOutcome::Success { access_token } => {
                self.store.sign_in_with_google(&access_token).await.map(CompletionStatus::SignedIn)
            }
            OAuthOutcome::Cancelled => {
                tracing::info!("google sign-in cancelled");
                Ok(CompletionStatus::Cancelled)
            }
            OAuthOutcome::Error(message) => {
                tracing::warn!(error = %message, "google consent failed");
                Ok(CompletionStatus::Denied(message))
            }
        };
        if self.store.snapshot().is_loading() {
            self.store.set_loading(false).await;
        }
        result
    }
}
