use std::sync::Arc;

use super::*;
use crate::net::error::ApiError;
use crate::state::test_helpers::{Call, ScriptedAuthApi, grant, ready_store, signed_in_store};

fn config() -> GoogleOAuthConfig {
    GoogleOAuthConfig {
        android_client_id: Some("android-id".into()),
        ios_client_id: None,
        web_client_id: Some("web-id".into()),
        redirect_uri: "dailyx://oauthredirect".into(),
    }
}

// =========================================================================
// Platform / config
// =========================================================================

#[test]
fn platform_parses_case_insensitively() {
    assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
    assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
    assert_eq!("WEB".parse::<Platform>().unwrap(), Platform::Web);
    assert!(matches!("windows".parse::<Platform>(), Err(OAuthError::UnknownPlatform(p)) if p == "windows"));
}

#[test]
fn client_id_per_platform() {
    let config = config();
    assert_eq!(config.client_id(Platform::Android).unwrap(), "android-id");
    assert_eq!(config.client_id(Platform::Web).unwrap(), "web-id");
    assert!(matches!(config.client_id(Platform::Ios), Err(OAuthError::MissingClientId(Platform::Ios))));
}

#[test]
fn empty_client_id_counts_as_missing() {
    let config = GoogleOAuthConfig { web_client_id: Some(String::new()), ..config() };
    assert!(config.client_id(Platform::Web).is_err());
}

#[test]
fn authorization_request_carries_expected_params() {
    let request = config().authorization_request(Platform::Web).unwrap();
    assert_eq!(request.url.host_str(), Some("accounts.google.com"));
    assert_eq!(request.url.path(), "/o/oauth2/v2/auth");

    let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "web-id");
    assert_eq!(params["redirect_uri"], "dailyx://oauthredirect");
    assert_eq!(params["response_type"], "token");
    assert_eq!(params["scope"], "openid profile email");
    assert_eq!(params["prompt"], "select_account");
    assert_eq!(params["state"], request.state);
}

#[test]
fn authorization_state_is_random_hex() {
    let a = config().authorization_request(Platform::Android).unwrap();
    let b = config().authorization_request(Platform::Android).unwrap();
    assert_eq!(a.state.len(), 32);
    assert!(a.state.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a.state, b.state);
}

#[test]
fn authorization_request_without_client_id_fails() {
    assert!(matches!(
        config().authorization_request(Platform::Ios),
        Err(OAuthError::MissingClientId(Platform::Ios))
    ));
}

// =========================================================================
// parse_redirect
// =========================================================================

#[test]
fn fragment_token_is_success() {
    let outcome = parse_redirect("dailyx://oauthredirect#access_token=ya29.abc&token_type=Bearer&state=s1", Some("s1"));
    assert_eq!(outcome, OAuthOutcome::Success { access_token: "ya29.abc".into() });
}

#[test]
fn query_token_is_accepted() {
    let outcome = parse_redirect("http://localhost/oauthredirect?access_token=ya29.q", None);
    assert_eq!(outcome, OAuthOutcome::Success { access_token: "ya29.q".into() });
}

#[test]
fn percent_encoded_values_are_decoded() {
    let outcome = parse_redirect("dailyx://oauthredirect#access_token=ya29%2Fabc", None);
    assert_eq!(outcome, OAuthOutcome::Success { access_token: "ya29/abc".into() });
}

#[test]
fn access_denied_is_cancelled() {
    assert_eq!(parse_redirect("dailyx://oauthredirect#error=access_denied", None), OAuthOutcome::Cancelled);
}

#[test]
fn bare_redirect_is_cancelled() {
    assert_eq!(parse_redirect("dailyx://oauthredirect", None), OAuthOutcome::Cancelled);
}

#[test]
fn provider_error_is_reported() {
    let outcome = parse_redirect(
        "dailyx://oauthredirect?error=invalid_request&error_description=bad+scope",
        None,
    );
    assert_eq!(outcome, OAuthOutcome::Error("invalid_request: bad scope".into()));
}

#[test]
fn state_mismatch_is_error() {
    let outcome = parse_redirect("dailyx://oauthredirect#access_token=ya29&state=other", Some("s1"));
    assert_eq!(outcome, OAuthOutcome::Error("OAuth state mismatch".into()));
}

#[test]
fn missing_token_is_error() {
    let outcome = parse_redirect("dailyx://oauthredirect#token_type=Bearer", None);
    assert!(matches!(outcome, OAuthOutcome::Error(_)));
}

#[test]
fn garbage_redirect_is_error() {
    assert!(matches!(parse_redirect("not a url", None), OAuthOutcome::Error(_)));
}

#[test]
fn outcome_debug_hides_token() {
    let outcome = OAuthOutcome::Success { access_token: "ya29.secret".into() };
    assert!(!format!("{outcome:?}").contains("ya29"));
}

// =========================================================================
// OAuthCompletion
// =========================================================================

#[tokio::test]
async fn success_exchanges_token_and_clears_loading() {
    let api = Arc::new(ScriptedAuthApi::new(vec![Ok(grant("Ann", "a@x.com", "G1"))]));
    let (store, _) = ready_store(api.clone()).await;
    let completion = OAuthCompletion::new(store.clone());

    completion.begin().await;
    assert!(store.snapshot().is_loading());

    let status = completion.complete(OAuthOutcome::Success { access_token: "ya29.abc".into() }).await.unwrap();
    assert!(matches!(status, CompletionStatus::SignedIn(user) if user.email == "a@x.com"));
    assert_eq!(store.token().as_deref(), Some("G1"));
    assert!(!store.snapshot().is_loading());
    assert_eq!(api.calls(), vec![Call::Google { access_token: "ya29.abc".into() }]);
}

#[tokio::test]
async fn already_authenticated_skips_exchange() {
    let store = signed_in_store().await;
    let completion = OAuthCompletion::new(store.clone());
    completion.begin().await;

    let status = completion.complete(OAuthOutcome::Success { access_token: "ya29.abc".into() }).await.unwrap();
    assert_eq!(status, CompletionStatus::AlreadyAuthenticated);
    assert_eq!(store.token().as_deref(), Some("T1"));
    assert!(!store.snapshot().is_loading());
}

#[tokio::test]
async fn cancel_and_provider_error_leave_session_alone() {
    let api = Arc::new(ScriptedAuthApi::new(Vec::new()));
    let (store, _) = ready_store(api.clone()).await;
    let completion = OAuthCompletion::new(store.clone());

    completion.begin().await;
    assert_eq!(completion.complete(OAuthOutcome::Cancelled).await.unwrap(), CompletionStatus::Cancelled);
    assert!(!store.snapshot().is_loading());

    completion.begin().await;
    let status = completion.complete(OAuthOutcome::Error("server_error".into())).await.unwrap();
    assert_eq!(status, CompletionStatus::Denied("server_error".into()));
    assert!(!store.snapshot().is_loading());
    assert!(!store.is_authenticated());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn failed_exchange_propagates_and_clears_loading() {
    let api = Arc::new(ScriptedAuthApi::new(vec![Err(ApiError::Status { status: 500, body: String::new() })]));
    let (store, _) = ready_store(api).await;
    let completion = OAuthCompletion::new(store.clone());

    completion.begin().await;
    let err = completion.complete(OAuthOutcome::Success { access_token: "ya29.abc".into() }).await.unwrap_err();
    assert!(matches!(err, SessionError::Api(ApiError::Status { status: 500, .. })));
    assert!(!store.is_authenticated());
    assert!(!store.snapshot().is_loading());
}
