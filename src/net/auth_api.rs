//! Remote auth API: credential exchange and registration.
//!
//! ARCHITECTURE
//! ============
//! `POST /v1/user/token?type=basic` takes `{email, password}` in the body;
//! `?type=google-oauth` takes the provider access token in the
//! `x-gaccess_token` header and no body. `POST /v1/user/` registers and
//! signs in at once. All three answer `{...user, auth_token}` or `{error}`.
//!
//! ERROR HANDLING
//! ==============
//! The backend reports bad credentials as `{error}` with HTTP 200, so the
//! body is inspected before the status: any `error` field is a failure.

#[cfg(test)]
#[path = "auth_api_test.rs"]
mod auth_api_test;

use std::fmt;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::error::ApiError;
use super::types::{AuthType, TokenGrant};
use crate::config::{ClientConfig, HttpTimeouts};

const GOOGLE_TOKEN_HEADER: &str = "x-gaccess_token";

/// What the client proves its identity with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { email: String, password: String },
    GoogleOAuth { access_token: String },
}

impl Credentials {
    #[must_use]
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::Basic { .. } => AuthType::Basic,
            Self::GoogleOAuth { .. } => AuthType::GoogleOAuth,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { email, .. } => f.debug_struct("Basic").field("email", email).finish_non_exhaustive(),
            Self::GoogleOAuth { .. } => f.debug_struct("GoogleOAuth").finish_non_exhaustive(),
        }
    }
}

/// Exchange of credentials for an application session token.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange `credentials` for a session token and user profile.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, an
    /// error-shaped body, or an unparseable body.
    async fn request_token(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;

    /// Create an account and return its first session token.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuthApi::request_token`].
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<TokenGrant, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = super::build_http_client(timeouts)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.timeouts)
    }

    async fn finish(response: Result<reqwest::Response, reqwest::Error>) -> Result<TokenGrant, ApiError> {
        let response = response.map_err(|e| ApiError::network(&e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::network(&e))?;
        parse_grant(status, &text)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn request_token(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        let url = token_endpoint(&self.base_url, credentials.auth_type());
        let request = match credentials {
            Credentials::Basic { email, password } => {
                self.http.post(&url).json(&serde_json::json!({ "email": email, "password": password }))
            }
            Credentials::GoogleOAuth { access_token } => self
                .http
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header(GOOGLE_TOKEN_HEADER, access_token),
        };
        let result = Self::finish(request.send().await).await;
        if let Err(e) = &result {
            tracing::warn!(auth_type = credentials.auth_type().as_str(), error = %e, "token request failed");
        }
        result
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        let request = self
            .http
            .post(register_endpoint(&self.base_url))
            .json(&serde_json::json!({ "name": name, "email": email, "password": password }));
        let result = Self::finish(request.send().await).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "registration failed");
        }
        result
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn token_endpoint(base_url: &str, auth_type: AuthType) -> String {
    format!("{base_url}/v1/user/token?type={}", auth_type.as_str())
}

fn register_endpoint(base_url: &str) -> String {
    format!("{base_url}/v1/user/")
}

/// Turn a raw auth response into a grant, treating any `error` field as a
/// failure regardless of `status`.
pub(crate) fn parse_grant(status: u16, body: &str) -> Result<TokenGrant, ApiError> {
    let value = super::check_body(status, body)?;
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}
