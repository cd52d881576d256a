use shared::{domain::UserId, protocol::UserProfile};
use tracing::{error, info};

use crate::{accounts::UserDirectory, error::ClientError};

const LOAD_FAILED: &str = "Failed to load users. Please try again later.";
const DELETE_FAILED: &str = "Failed to delete user. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user: UserProfile,
    /// False for the signed-in admin's own account.
    pub can_delete: bool,
}

/// State behind the user-management screen.
#[derive(Debug, Clone, Default)]
pub struct AdminPanel {
    current_user_id: Option<UserId>,
    users: Vec<UserProfile>,
    loading: bool,
    error: Option<String>,
}

impl AdminPanel {
    pub fn new(current_user: Option<&UserProfile>) -> Self {
        Self {
            current_user_id: current_user.and_then(|user| user.id),
            ..Self::default()
        }
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        !self.loading && self.users.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("{} registered users", self.users.len())
    }

    pub fn rows(&self) -> Vec<UserRow> {
        self.users
            .iter()
            .map(|user| UserRow {
                can_delete: !self.is_self(user.id),
                user: user.clone(),
            })
            .collect()
    }

    fn is_self(&self, id: Option<UserId>) -> bool {
        id.is_some() && id == self.current_user_id
    }

    pub async fn load(&mut self, directory: &dyn UserDirectory) -> Result<(), ClientError> {
        self.loading = true;
        self.error = None;
        let outcome = directory.list_users().await;
        self.loading = false;
        match outcome {
            Ok(users) => {
                info!(count = users.len(), "admin: users loaded");
                self.users = users;
                Ok(())
            }
            Err(err) => {
                error!("admin: failed to load users: {err}");
                self.error = Some(LOAD_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Deletes another user's account. The caller's own account is never a
    /// valid target.
    pub async fn delete(
        &mut self,
        directory: &dyn UserDirectory,
        id: UserId,
    ) -> Result<(), ClientError> {
        if self.is_self(Some(id)) {
            return Err(ClientError::Validation(
                "you cannot delete your own account".to_string(),
            ));
        }

        self.loading = true;
        let outcome = directory.delete_user(id).await;
        self.loading = false;
        match outcome {
            Ok(()) => {
                self.users.retain(|user| user.id != Some(id));
                Ok(())
            }
            Err(err) => {
                error!(user_id = id.0, "admin: failed to delete user: {err}");
                self.error = Some(DELETE_FAILED.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
