//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::oauth::GoogleOAuthConfig;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OAUTH_REDIRECT_URI: &str = "dailyx://oauthredirect";
const DATA_DIR_NAME: &str = ".dailyx";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// How the session token is placed in the `Authorization` header.
///
/// The backend has always received the bare token; `Bearer` exists for
/// deployments fronted by a proxy that expects the standard scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    #[default]
    Raw,
    Bearer,
}

impl AuthScheme {
    /// Render the header value for `token`.
    #[must_use]
    pub fn header_value(self, token: &str) -> String {
        match self {
            Self::Raw => token.to_owned(),
            Self::Bearer => format!("Bearer {token}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without trailing slash; endpoint paths carry `/v1`.
    pub api_url: String,
    pub auth_scheme: AuthScheme,
    pub timeouts: HttpTimeouts,
    /// Directory holding the persisted session file.
    pub data_dir: PathBuf,
    pub google: GoogleOAuthConfig,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `DAILYX_API_URL`: default `http://127.0.0.1:3000`
    /// - `DAILYX_AUTH_SCHEME`: `raw` (default) or `bearer`
    /// - `DAILYX_REQUEST_TIMEOUT_SECS`: default 30
    /// - `DAILYX_CONNECT_TIMEOUT_SECS`: default 10
    /// - `DAILYX_HOME`: default `$HOME/.dailyx`
    /// - `DAILYX_GOOGLE_CLIENT_ID_ANDROID` / `_IOS` / `_WEB`
    /// - `DAILYX_OAUTH_REDIRECT_URI`: default `dailyx://oauthredirect`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for an unknown auth scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("DAILYX_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let auth_scheme = parse_auth_scheme(std::env::var("DAILYX_AUTH_SCHEME").ok().as_deref())?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("DAILYX_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("DAILYX_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let data_dir = std::env::var_os("DAILYX_HOME").map_or_else(default_data_dir, PathBuf::from);
        let google = GoogleOAuthConfig {
            android_client_id: std::env::var("DAILYX_GOOGLE_CLIENT_ID_ANDROID").ok(),
            ios_client_id: std::env::var("DAILYX_GOOGLE_CLIENT_ID_IOS").ok(),
            web_client_id: std::env::var("DAILYX_GOOGLE_CLIENT_ID_WEB").ok(),
            redirect_uri: std::env::var("DAILYX_OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_OAUTH_REDIRECT_URI.to_string()),
        };

        Ok(Self { api_url, auth_scheme, timeouts, data_dir, google })
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| PathBuf::from(home).join(DATA_DIR_NAME))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_auth_scheme(raw: Option<&str>) -> Result<AuthScheme, ConfigError> {
    match raw.unwrap_or("raw") {
        "raw" => Ok(AuthScheme::Raw),
        "bearer" => Ok(AuthScheme::Bearer),
        other => Err(ConfigError::Parse(format!(
            "unsupported DAILYX_AUTH_SCHEME '{other}' (expected 'raw' or 'bearer')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
