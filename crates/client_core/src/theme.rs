use std::sync::Arc;

use shared::domain::Theme;
use storage::{KeyValueStore, THEME_KEY};
use tracing::warn;

use crate::error::ClientError;

/// Light/dark preference persisted under [`THEME_KEY`]. Absent means light.
pub struct ThemePreference {
    store: Arc<dyn KeyValueStore>,
}

impl ThemePreference {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Theme, ClientError> {
        let Some(raw) = self.store.get(THEME_KEY).await? else {
            return Ok(Theme::default());
        };
        Ok(raw.parse().unwrap_or_else(|err| {
            warn!("ignoring stored theme: {err}");
            Theme::default()
        }))
    }

    pub async fn set(&self, theme: Theme) -> Result<(), ClientError> {
        self.store.put(THEME_KEY, theme.as_str()).await?;
        Ok(())
    }

    pub async fn toggle(&self) -> Result<Theme, ClientError> {
        let next = self.load().await?.toggled();
        self.set(next).await?;
        Ok(next)
    }
}
