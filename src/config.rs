use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV: &str = "PAPER_QA_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Conversation identifier sent with every question. Generated per run when unset.
    pub thread_id: Option<String>,
    pub chat_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    /// Applies to new-session, clear-all and health calls.
    pub control_timeout_secs: u64,
    pub health_poll_secs: u64,
    /// Shown to the user; the service enforces the real limit.
    pub max_upload_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            thread_id: None,
            chat_timeout_secs: 60,
            upload_timeout_secs: 300,
            control_timeout_secs: 30,
            health_poll_secs: 15,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".paper-qa").join("config.toml"))
    }

    /// Reads `explicit` when given, otherwise the default path if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ClientError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|err| ClientError::Config(format!("{} in {}", err, path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| ClientError::Config(format!("invalid TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ClientError::Config("api_base_url must not be empty".to_string()));
        }
        for (name, value) in [
            ("chat_timeout_secs", self.chat_timeout_secs),
            ("upload_timeout_secs", self.upload_timeout_secs),
            ("control_timeout_secs", self.control_timeout_secs),
            ("health_poll_secs", self.health_poll_secs),
        ] {
            if value == 0 {
                return Err(ClientError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn resolve_thread_id(&self) -> String {
        match self.thread_id.as_deref().map(str::trim) {
            Some(thread_id) if !thread_id.is_empty() => thread_id.to_string(),
            _ => format!("client_{}", uuid::Uuid::new_v4().simple()),
        }
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_secs)
    }
}
