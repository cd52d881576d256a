use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Local rule violation; nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error("not signed in")]
    NotAuthenticated,
    /// The server rejected the bearer credential. Local session data has
    /// already been cleared when this is returned.
    #[error("session expired or credential rejected; sign in again")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed with status {status}: {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid server response: {0}")]
    Decode(String),
    #[error("local storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ClientError {
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NotAuthenticated)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Api {
                    code: ErrorCode::NotFound,
                    ..
                }
        )
    }
}
