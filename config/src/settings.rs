//! Application settings management

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;

/// Application settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Host the image server binds to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the image server binds to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL prefix stored images are served under
    #[serde(default = "default_public_base")]
    pub public_base: String,
    /// Override for the image store directory
    pub store_dir: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_public_base() -> String {
    "/assets/images".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base: default_public_base(),
            store_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    /// Base URL the gallery uses to reach the server by default
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
