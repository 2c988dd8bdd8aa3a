//! Application settings and persistence

use anyhow::Result;
use directories::{ProjectDirs, UserDirs};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::PermissionKind;
use crate::store::is_valid_key;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the durable key-value store
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    /// Directory watched for newly taken photos
    #[serde(default = "default_capture_directory")]
    pub capture_directory: PathBuf,

    /// Directory the library picker browses
    #[serde(default = "default_library_directory")]
    pub library_directory: PathBuf,

    /// Key the gallery is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Number of columns in the gallery grid
    #[serde(default = "default_grid_columns")]
    pub grid_columns: u32,

    /// How long to wait for a new photo before giving up
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    /// Permissions the user has already allowed
    #[serde(default)]
    pub granted_permissions: Vec<PermissionKind>,
}

fn default_data_directory() -> PathBuf {
    ProjectDirs::from("com", "snapshelf", "Snapshelf")
        .map(|dirs| dirs.data_dir().join("storage"))
        .unwrap_or_else(|| PathBuf::from("snapshelf-storage"))
}

fn default_capture_directory() -> PathBuf {
    pictures_dir().join("Camera")
}

fn default_library_directory() -> PathBuf {
    pictures_dir()
}

fn default_storage_key() -> String {
    "gallery".to_string()
}

fn default_grid_columns() -> u32 {
    3
}

fn default_capture_timeout_secs() -> u64 {
    120
}

fn pictures_dir() -> PathBuf {
    if let Some(user_dirs) = UserDirs::new() {
        if let Some(pictures) = user_dirs.picture_dir() {
            return pictures.to_path_buf();
        }
        return user_dirs.home_dir().join("Pictures");
    }
    PathBuf::from("Pictures")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            capture_directory: default_capture_directory(),
            library_directory: default_library_directory(),
            storage_key: default_storage_key(),
            grid_columns: default_grid_columns(),
            capture_timeout_secs: default_capture_timeout_secs(),
            granted_permissions: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "snapshelf", "Snapshelf")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;

        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Replace a storage key the store would refuse with the default.
    /// Returns true if the key was replaced.
    pub fn ensure_valid_storage_key(&mut self) -> bool {
        if is_valid_key(&self.storage_key) {
            return false;
        }
        warn!(
            "Storage key {:?} is not usable, falling back to {:?}",
            self.storage_key,
            default_storage_key()
        );
        self.storage_key = default_storage_key();
        true
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn is_granted(&self, kind: PermissionKind) -> bool {
        self.granted_permissions.contains(&kind)
    }

    /// Remember a grant; returns false if it was already recorded
    pub fn grant(&mut self, kind: PermissionKind) -> bool {
        if self.is_granted(kind) {
            return false;
        }
        self.granted_permissions.push(kind);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();

        assert_eq!(settings.storage_key, "gallery");
        assert_eq!(settings.grid_columns, 3);
        assert_eq!(settings.capture_timeout_secs, 120);
        assert_eq!(settings.capture_timeout(), Duration::from_secs(120));
        assert!(settings.granted_permissions.is_empty());
        assert!(settings.capture_directory.ends_with("Camera"));
    }

    #[test]
    fn test_settings_with_custom_values() {
        let json = r#"{
            "data_directory": "/custom/data",
            "capture_directory": "/custom/camera",
            "library_directory": "/custom/pictures",
            "storage_key": "photos",
            "grid_columns": 4,
            "capture_timeout_secs": 5,
            "granted_permissions": ["Camera"]
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.data_directory, PathBuf::from("/custom/data"));
        assert_eq!(settings.capture_directory, PathBuf::from("/custom/camera"));
        assert_eq!(settings.library_directory, PathBuf::from("/custom/pictures"));
        assert_eq!(settings.storage_key, "photos");
        assert_eq!(settings.grid_columns, 4);
        assert_eq!(settings.capture_timeout(), Duration::from_secs(5));
        assert!(settings.is_granted(PermissionKind::Camera));
        assert!(!settings.is_granted(PermissionKind::MediaLibrary));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"grid_columns": 5}"#).unwrap();
        assert_eq!(settings.grid_columns, 5);
        assert_eq!(settings.storage_key, "gallery");
        assert_eq!(settings.capture_timeout_secs, 120);
    }

    #[test]
    fn test_invalid_storage_key_falls_back() {
        for bad in ["my gallery", "", ".gallery", "../gallery", "a/b"] {
            let mut settings = Settings {
                storage_key: bad.to_string(),
                ..Settings::default()
            };
            assert!(settings.ensure_valid_storage_key(), "key: {:?}", bad);
            assert_eq!(settings.storage_key, "gallery");
        }

        let mut settings = Settings {
            storage_key: "photos-v2".to_string(),
            ..Settings::default()
        };
        assert!(!settings.ensure_valid_storage_key());
        assert_eq!(settings.storage_key, "photos-v2");
    }

    #[tokio::test]
    async fn test_fallback_key_is_usable_by_the_store() {
        use crate::gallery::GalleryStore;
        use crate::store::MemoryStore;

        let mut settings: Settings = serde_json::from_str(r#"{"storage_key": "my photos"}"#).unwrap();
        settings.ensure_valid_storage_key();

        let gallery = GalleryStore::new(MemoryStore::new(), settings.storage_key.clone());
        gallery.load().await.unwrap();
        gallery.append("a.png".to_string()).await.unwrap();
    }

    #[test]
    fn test_grant_is_recorded_once() {
        let mut settings = Settings::default();
        assert!(settings.grant(PermissionKind::MediaLibrary));
        assert!(!settings.grant(PermissionKind::MediaLibrary));
        assert_eq!(settings.granted_permissions, vec![PermissionKind::MediaLibrary]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");

        let mut settings = Settings::default();
        settings.grid_columns = 2;
        settings.grant(PermissionKind::Camera);
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.grid_columns, 2);
        assert!(loaded.is_granted(PermissionKind::Camera));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.storage_key, "gallery");
    }
}
