use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use shared::protocol::UserProfile;
use storage::{load_json, save_json, KeyValueStore, EXPIRES_AT_KEY, TOKEN_KEY, USER_KEY};
use tracing::warn;

use crate::error::ClientError;

/// Everything persisted for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Option<UserProfile>,
}

impl StoredCredential {
    /// Valid only while the expiry lies strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Bearer token, absolute expiry and cached profile, kept under the fixed
/// `token`, `expiresAt` and `user` keys.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists a fresh token; `expires_in_secs` is relative to `now`. An
    /// expiry chrono cannot represent is rejected and nothing is written.
    pub async fn save_login(
        &self,
        token: &str,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ClientError> {
        let expires_at = Duration::try_seconds(expires_in_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ClientError::Decode(format!("expiresIn out of range: {expires_in_secs}"))
            })?;
        self.store.put(TOKEN_KEY, token).await?;
        self.store
            .put(EXPIRES_AT_KEY, &expires_at.timestamp_millis().to_string())
            .await?;
        Ok(expires_at)
    }

    pub async fn token(&self) -> Result<Option<String>, ClientError> {
        Ok(self
            .store
            .get(TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty()))
    }

    pub async fn expires_at(&self) -> Result<Option<DateTime<Utc>>, ClientError> {
        let Some(raw) = self.store.get(EXPIRES_AT_KEY).await? else {
            return Ok(None);
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
        if parsed.is_none() {
            warn!(raw = raw.as_str(), "ignoring unreadable stored expiry");
        }
        Ok(parsed)
    }

    /// A token is usable only while its stored expiry lies after `now`; the
    /// answer is never cached.
    pub async fn is_authenticated_at(&self, now: DateTime<Utc>) -> Result<bool, ClientError> {
        Ok(self
            .load()
            .await?
            .is_some_and(|credential| credential.is_valid_at(now)))
    }

    /// Storage failures read as signed out.
    pub async fn is_authenticated(&self) -> bool {
        match self.is_authenticated_at(Utc::now()).await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                warn!("credential check failed: {err}");
                false
            }
        }
    }

    pub async fn user(&self) -> Result<Option<UserProfile>, ClientError> {
        match load_json::<UserProfile>(self.store.as_ref(), USER_KEY).await {
            Ok(user) => Ok(user),
            Err(err) => {
                warn!("discarding unreadable cached profile: {err:#}");
                Ok(None)
            }
        }
    }

    pub async fn store_user(&self, user: &UserProfile) -> Result<(), ClientError> {
        save_json(self.store.as_ref(), USER_KEY, user).await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<StoredCredential>, ClientError> {
        let Some(token) = self.token().await? else {
            return Ok(None);
        };
        let Some(expires_at) = self.expires_at().await? else {
            return Ok(None);
        };
        Ok(Some(StoredCredential {
            token,
            expires_at,
            user: self.user().await?,
        }))
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        for key in [TOKEN_KEY, EXPIRES_AT_KEY, USER_KEY] {
            self.store.remove(key).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Minimal profile read from the token's payload segment: `sub` is the email,
/// and the username falls back to the local part of the login email. The
/// signature is not checked; the server does that.
pub fn profile_from_token(token: &str, login_email: &str) -> Option<UserProfile> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: TokenClaims = serde_json::from_slice(&bytes).ok()?;

    let email = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .unwrap_or_else(|| login_email.to_string());
    let username = claims
        .username
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            login_email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    Some(UserProfile {
        username,
        email,
        ..UserProfile::default()
    })
}

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod tests;
