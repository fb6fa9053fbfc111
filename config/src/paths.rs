use directories::BaseDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

pub struct PathManager;

impl PathManager {
    /// Set a custom data directory (useful for tests and sandboxed deployments)
    pub fn set_data_dir(path: PathBuf) {
        let _ = DATA_DIR_OVERRIDE.set(path);
    }

    // Helper to get the base data directory
    fn base_data_dir() -> Option<PathBuf> {
        if let Some(d) = DATA_DIR_OVERRIDE.get() {
            return Some(d.clone());
        }
        BaseDirs::new().map(|d| d.data_dir().join("picstash"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        Self::base_data_dir()
    }

    pub fn config_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|d| d.config_dir().join("picstash"))
    }

    /// Flat directory the image store persists uploads into
    pub fn images_dir() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("images"))
    }

    pub fn logs_dir() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("logs"))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.toml"))
    }

    pub fn ensure_dirs_exist() -> std::io::Result<()> {
        if let Some(d) = Self::data_dir() {
            std::fs::create_dir_all(&d)?;
        }
        if let Some(d) = Self::config_dir() {
            std::fs::create_dir_all(&d)?;
        }
        if let Some(d) = Self::images_dir() {
            std::fs::create_dir_all(&d)?;
        }
        if let Some(d) = Self::logs_dir() {
            std::fs::create_dir_all(&d)?;
        }
        Ok(())
    }
}
