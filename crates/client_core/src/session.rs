use std::sync::Arc;

use shared::{domain::Role, protocol::UserProfile};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use crate::{
    accounts::AccountsApi,
    credentials::CredentialStore,
    error::ClientError,
    transport::{AuthTransport, SessionEvent},
};

/// What the rest of the client knows about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    /// True until the initial credential check has finished.
    pub loading: bool,
    /// Bumped on every auth state change so dependent views reload.
    pub trigger: u64,
}

impl SessionState {
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn update_auth_state(&mut self, authenticated: bool, user: Option<UserProfile>) {
        self.authenticated = authenticated;
        match user {
            Some(user) => self.user = Some(user),
            None if !authenticated => self.user = None,
            None => {}
        }
        self.trigger = self.trigger.wrapping_add(1);
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().and_then(|user| user.role)
    }
}

/// Owns the session for one front end. Passed explicitly to whatever needs
/// it; there is no global session.
pub struct SessionManager {
    accounts: AccountsApi,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(transport: Arc<AuthTransport>) -> Self {
        Self {
            accounts: AccountsApi::new(transport),
            state: RwLock::new(SessionState::initial()),
        }
    }

    pub fn accounts(&self) -> &AccountsApi {
        &self.accounts
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.accounts.transport().credentials()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.accounts.transport().subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Re-reads the stored credential against the current time.
    pub async fn is_authenticated(&self) -> bool {
        self.credentials().is_authenticated().await
    }

    pub async fn update_auth_state(&self, authenticated: bool, user: Option<UserProfile>) {
        self.state.write().await.update_auth_state(authenticated, user);
    }

    /// Startup check: validates the stored credential and loads the profile.
    /// A profile that cannot be loaded leaves the session signed out.
    pub async fn initialize(&self) -> SessionState {
        self.state.write().await.loading = true;

        let mut authenticated = self.is_authenticated().await;
        let mut user = None;
        if authenticated {
            match self.resolve_user().await {
                Ok(profile) => user = Some(profile),
                Err(err) => {
                    error!("session: failed to load user data: {err}");
                    authenticated = false;
                }
            }
        }

        let mut state = self.state.write().await;
        state.authenticated = authenticated;
        state.user = user;
        state.loading = false;
        info!(authenticated, "session: initialized");
        state.clone()
    }

    /// The one place a role is resolved: the cached profile when it carries a
    /// role, otherwise `/api/users/me`. `Ok(None)` when signed out.
    pub async fn resolve_role(&self) -> Result<Option<Role>, ClientError> {
        if !self.is_authenticated().await {
            return Ok(None);
        }
        if let Some(role) = self.state.read().await.role() {
            return Ok(Some(role));
        }

        let user = self.resolve_user().await?;
        let role = user.role;
        self.state.write().await.user = Some(user);
        Ok(role)
    }

    async fn resolve_user(&self) -> Result<UserProfile, ClientError> {
        match self.credentials().user().await? {
            Some(cached) if cached.role.is_some() => Ok(cached),
            _ => self.accounts.current_user().await,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let user = self.accounts.login(email, password).await?;
        self.update_auth_state(true, Some(user.clone())).await;
        self.accounts.transport().publish(SessionEvent::SignedIn);
        info!(username = user.username.as_str(), "session: signed in");
        Ok(user)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        self.accounts.register(username, email, password).await
    }

    pub async fn logout(&self) {
        if let Err(err) = self.accounts.logout().await {
            error!("session: failed to clear stored credentials: {err}");
        }
        self.update_auth_state(false, None).await;
        self.accounts.transport().publish(SessionEvent::SignedOut);
        info!("session: signed out");
    }

    /// Applies a transport notification. Returns true when the session state
    /// changed.
    pub async fn handle_event(&self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::SignInRequired => {
                let mut state = self.state.write().await;
                if !state.authenticated && state.user.is_none() {
                    return false;
                }
                warn!("session: server rejected credential; signing out");
                state.update_auth_state(false, None);
                true
            }
            SessionEvent::SignedIn | SessionEvent::SignedOut => false,
        }
    }

    /// Signs the in-memory session out once the stored credential has expired
    /// or disappeared.
    pub async fn expire_if_needed(&self) -> SessionState {
        let still_valid = self.is_authenticated().await;
        let mut state = self.state.write().await;
        if state.authenticated && !still_valid {
            info!("session: credential expired");
            state.update_auth_state(false, None);
        }
        state.clone()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
