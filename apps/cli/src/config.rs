use std::{collections::HashMap, fmt, fs, path::Path, str::FromStr};

use anyhow::bail;
use client_core::DEFAULT_PAGE_SIZE;
use tracing::warn;

pub const SETTINGS_FILE: &str = "series.toml";

/// Where the series collection lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Remote,
    Local,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => bail!("unknown mode '{other}' (expected remote or local)"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remote => "remote",
            Self::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub database_url: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".into(),
            database_url: "sqlite://./data/series.db".into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            mode: Mode::Remote,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then the environment. Later sources
/// win; unreadable values are skipped with a warning.
pub fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                let lookup = |key: &str| file_cfg.get(key).cloned();
                apply(&mut settings, "api_url", lookup("api_url"));
                apply(&mut settings, "database_url", lookup("database_url"));
                apply(&mut settings, "page_size", lookup("page_size"));
                apply(&mut settings, "request_timeout_secs", lookup("request_timeout_secs"));
                apply(&mut settings, "mode", lookup("mode"));
            }
            Err(err) => warn!(path = %file.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    apply(&mut settings, "api_url", env("SERIES_API_URL"));
    apply(&mut settings, "api_url", env("APP__API_URL"));
    apply(&mut settings, "database_url", env("DATABASE_URL"));
    apply(&mut settings, "database_url", env("APP__DATABASE_URL"));
    apply(&mut settings, "page_size", env("APP__PAGE_SIZE"));
    apply(&mut settings, "request_timeout_secs", env("APP__REQUEST_TIMEOUT_SECS"));
    apply(&mut settings, "mode", env("APP__MODE"));

    settings.database_url = normalize_database_url(&settings.database_url);
    settings
}

fn apply(settings: &mut Settings, key: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match key {
        "api_url" => settings.api_url = value,
        "database_url" => settings.database_url = value,
        "page_size" => match value.trim().parse::<u32>() {
            Ok(size) if size > 0 => settings.page_size = size,
            _ => warn!(value = value.as_str(), "ignoring invalid page size"),
        },
        "request_timeout_secs" => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => settings.request_timeout_secs = secs,
            _ => warn!(value = value.as_str(), "ignoring invalid request timeout"),
        },
        "mode" => match value.parse::<Mode>() {
            Ok(mode) => settings.mode = mode,
            Err(err) => warn!("{err}"),
        },
        _ => {}
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
