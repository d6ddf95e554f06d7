use std::path::Path;

use monitor::MonitorConfig;
use notify::NotificationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Contents of `settings.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub notification: NotificationConfig,
}

impl Settings {
    /// Load settings from file, or create it with defaults if missing.
    pub async fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let default = Settings::default();
                tokio::fs::write(path, toml::to_string_pretty(&default)?).await?;
                tracing::info!("Created default settings at {}", path.display());
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }
}
