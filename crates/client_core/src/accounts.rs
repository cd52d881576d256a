use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use shared::{
    domain::UserId,
    protocol::{LoginRequest, LoginResponse, SignupRequest, UserProfile},
};
use tracing::{error, info, warn};

use crate::{credentials::profile_from_token, error::ClientError, transport::AuthTransport};

/// Admin-side view of the account collection.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError>;
    async fn delete_user(&self, id: UserId) -> Result<(), ClientError>;
}

pub struct AccountsApi {
    transport: Arc<AuthTransport>,
}

impl AccountsApi {
    pub fn new(transport: Arc<AuthTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<AuthTransport> {
        &self.transport
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .transport
            .anonymous(Method::POST, "/api/auth/signup")
            .json(&SignupRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            });
        self.transport
            .send_anonymous(request)
            .await
            .inspect_err(|err| error!("auth: registration failed: {err}"))?;
        info!(username, "auth: registered");
        Ok(())
    }

    /// Signs in and persists the credential. The returned profile is the full
    /// server record when it could be fetched, otherwise the minimal profile
    /// read from the token.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let request = self
            .transport
            .anonymous(Method::POST, "/api/auth/login")
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse = self
            .transport
            .send_anonymous_json(request)
            .await
            .inspect_err(|err| error!("auth: login failed: {err}"))?;

        let credentials = self.transport.credentials();
        let expires_at = credentials
            .save_login(&response.token, response.expires_in, Utc::now())
            .await?;
        info!(%expires_at, "auth: credential stored");

        let Some(minimal) = profile_from_token(&response.token, email) else {
            warn!("auth: token payload unreadable; profile left empty");
            return Ok(UserProfile {
                email: email.to_string(),
                ..UserProfile::default()
            });
        };
        credentials.store_user(&minimal).await?;

        match self.current_user().await {
            Ok(full) => Ok(full),
            Err(err) => {
                warn!("auth: could not load full profile after login: {err}");
                Ok(minimal)
            }
        }
    }

    /// Fetches `/api/users/me` and caches it as the stored profile.
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let request = self
            .transport
            .authorized(Method::GET, "/api/users/me")
            .await?;
        let user: UserProfile = self
            .transport
            .send_json(request)
            .await
            .inspect_err(|err| error!("auth: fetching current user failed: {err}"))?;
        self.transport.credentials().store_user(&user).await?;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.transport.credentials().clear().await
    }
}

#[async_trait]
impl UserDirectory for AccountsApi {
    async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        let request = self
            .transport
            .authorized(Method::GET, "/api/users/all")
            .await?;
        self.transport
            .send_json(request)
            .await
            .inspect_err(|err| error!("admin: fetching users failed: {err}"))
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ClientError> {
        let request = self
            .transport
            .authorized(Method::DELETE, &format!("/api/users/delete/{id}"))
            .await?;
        self.transport
            .send(request)
            .await
            .inspect_err(|err| error!(user_id = id.0, "admin: deleting user failed: {err}"))?;
        info!(user_id = id.0, "admin: user deleted");
        Ok(())
    }
}
