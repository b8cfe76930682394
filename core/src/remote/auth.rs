use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::{ConfigError, RemoteConfig};

/// A signed-in session returned by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created; the backend wants the email address confirmed
    /// before the first sign-in.
    ConfirmationRequired,
    /// Account created and signed in immediately.
    SignedIn(Session),
}

/// Failure talking to the auth backend.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address not confirmed yet")]
    EmailNotConfirmed,
    #[error("auth backend error: {0}")]
    Provider(String),
    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Client for the credential/session backend.
///
/// Holds the current session and broadcasts every change on a watch
/// channel; the application listens there to decide which playlist
/// sources are active. Passwords pass through to the backend and are
/// never stored.
pub struct AuthClient {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
    sessions: watch::Sender<Option<Session>>,
}

impl AuthClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let (url, key) = config.require_auth()?;
        let (sessions, _) = watch::channel(None);
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: key.to_string(),
            client: super::http_client(),
            sessions,
        })
    }

    /// Subscribe to session changes (sign-in publishes `Some`, sign-out
    /// publishes `None`).
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    /// The current session, if signed in.
    pub fn session(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }

    /// Create an account with email and password.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.map_failure(response).await);
        }

        let payload: TokenResponse = response.json().await?;
        match payload.into_session() {
            Some(session) => {
                info!("sign-up for {email} returned an immediate session");
                self.publish(Some(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => {
                info!("sign-up for {email} requires email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(format!(
                "{}/auth/v1/token?grant_type=password",
                self.base_url
            ))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.map_failure(response).await);
        }

        let payload: TokenResponse = response.json().await?;
        let session = payload
            .into_session()
            .ok_or_else(|| AuthError::Provider("sign-in response had no session".to_string()))?;
        info!("signed in as {}", session.email.as_deref().unwrap_or(email));
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// URL to send the user to for an OAuth sign-in with `provider`.
    ///
    /// The redirect happens in a browser; this process only builds the URL.
    pub fn oauth_authorize_url(&self, provider: &str, redirect_to: Option<&str>) -> String {
        let mut url = format!("{}/auth/v1/authorize?provider={provider}", self.base_url);
        if let Some(redirect) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(redirect);
        }
        url
    }

    /// Sign out, revoking the token best-effort and always dropping the
    /// local session.
    pub async fn sign_out(&self) {
        if let Some(session) = self.session() {
            let result = self
                .client
                .post(format!("{}/auth/v1/logout", self.base_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                warn!("sign-out request failed, dropping session anyway: {e}");
            }
        }
        info!("signed out");
        self.publish(None);
    }

    fn publish(&self, session: Option<Session>) {
        // send only fails with no receivers; the state still updates
        self.sessions.send_replace(session);
    }

    async fn map_failure(&self, response: reqwest::Response) -> AuthError {
        let status = response.status();
        match response.json::<ErrorPayload>().await {
            Ok(payload) => map_provider_message(&payload.display(status.as_u16())),
            Err(_) => map_provider_message(&format!("status {status}")),
        }
    }
}

/// Map a backend failure message onto the user-facing taxonomy.
fn map_provider_message(message: &str) -> AuthError {
    if message.contains("Invalid") {
        AuthError::InvalidCredentials
    } else if message.contains("confirmed") {
        AuthError::EmailNotConfirmed
    } else {
        AuthError::Provider(message.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Option<Session> {
        Some(Session {
            access_token: self.access_token?,
            refresh_token: self.refresh_token,
            email: self.user.and_then(|u| u.email),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorPayload {
    fn display(&self, status: u16) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| format!("status {status}"))
    }
}
