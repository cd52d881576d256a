use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::error::{ApiError, ErrorCode};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::{credentials::CredentialStore, error::ClientError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session-level notifications raised by the transport and the session
/// manager. `SignInRequired` means local credentials are gone and the front
/// end must navigate to the sign-in view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    SignInRequired,
}

/// HTTP transport that attaches the stored bearer token to every request and
/// turns a 401 into a forced sign-out.
pub struct AuthTransport {
    http: Client,
    base_url: String,
    credentials: CredentialStore,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthTransport {
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialStore,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    pub fn with_client(
        http: Client,
        base_url: impl Into<String>,
        credentials: CredentialStore,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request carrying `Authorization: Bearer <token>` when a token is stored.
    pub async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.url(path));
        Ok(match self.credentials.token().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Request without credentials, for sign-in and registration.
    pub fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Sends an authorized request. A 401 clears the stored session and
    /// publishes [`SessionEvent::SignInRequired`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.reject_session(response.url().path()).await;
            return Err(ClientError::Unauthorized);
        }
        check_status(response).await
    }

    /// Sends a request whose 401 means bad input (wrong password) rather than
    /// an expired session.
    pub async fn send_anonymous(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        check_status(response).await
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        decode_json(response).await
    }

    pub async fn send_anonymous_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send_anonymous(request).await?;
        decode_json(response).await
    }

    async fn reject_session(&self, path: &str) {
        warn!(path, "credential rejected by server; clearing local session");
        if let Err(err) = self.credentials.clear().await {
            error!("failed to clear stored credentials after 401: {err}");
        }
        self.publish(SessionEvent::SignInRequired);
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .and_then(|api_error| api_error.summary())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    debug!(status = status.as_u16(), message = message.as_str(), "request failed");

    Err(ClientError::Api {
        code: ErrorCode::from_status(status.as_u16()),
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
}
