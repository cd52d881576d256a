use std::{sync::Arc, time::Duration};

use storage::KeyValueStore;

pub mod accounts;
pub mod admin;
pub mod credentials;
pub mod error;
pub mod form;
pub mod guard;
pub mod list_view;
pub mod local_store;
pub mod mapping;
pub mod series_api;
pub mod session;
pub mod theme;
pub mod transport;
pub mod types;

pub use accounts::{AccountsApi, UserDirectory};
pub use admin::{AdminPanel, UserRow};
pub use credentials::{CredentialStore, StoredCredential};
pub use error::ClientError;
pub use form::{EntryForm, FieldErrors, FormField, FormIntent, FormMode};
pub use guard::{AccessGuard, AdminGuard, GuardDecision, Route};
pub use list_view::{ListChange, ListController, ListStatus, ListView, Pagination};
pub use local_store::LocalSeriesStore;
pub use series_api::{HttpSeriesApi, SeriesApi};
pub use session::{SessionManager, SessionState};
pub use theme::ThemePreference;
pub use transport::{AuthTransport, SessionEvent, DEFAULT_REQUEST_TIMEOUT};
pub use types::{Series, SeriesDraft, SeriesPage, SeriesQuery, DEFAULT_PAGE_SIZE};

/// Everything a front end needs to talk to a series backend, sharing one
/// transport and one credential store.
pub struct RemoteServices {
    pub transport: Arc<AuthTransport>,
    pub series: Arc<HttpSeriesApi>,
    pub session: Arc<SessionManager>,
}

impl RemoteServices {
    pub fn connect(
        base_url: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let transport = Arc::new(AuthTransport::new(
            base_url,
            CredentialStore::new(store),
            timeout,
        )?);
        Ok(Self::from_transport(transport))
    }

    pub fn from_transport(transport: Arc<AuthTransport>) -> Self {
        Self {
            series: Arc::new(HttpSeriesApi::new(Arc::clone(&transport))),
            session: Arc::new(SessionManager::new(Arc::clone(&transport))),
            transport,
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
