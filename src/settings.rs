use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::camera::FacingMode;

pub const DEFAULT_STORAGE_KEY: &str = "receipts";
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_DISPLAY_LOCALE: &str = "ja-JP";
pub const DEFAULT_WIDE_VIEWPORT_BREAKPOINT: u32 = 768;

const ENV_STORAGE_KEY: &str = "RECEIPTS_STORAGE_KEY";
const ENV_JPEG_QUALITY: &str = "RECEIPTS_JPEG_QUALITY";
const ENV_LOCALE: &str = "RECEIPTS_LOCALE";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    Sqlite,
    /// One JSON file per key under `<data dir>/storage`.
    File,
    /// Nothing survives the process; useful for kiosks and demos.
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Sqlite
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    /// Key under which the whole receipt collection is stored.
    pub storage_key: String,
    pub jpeg_quality: u8,
    /// BCP 47 tag used to format the display date of new receipts.
    pub display_locale: String,
    pub preferred_facing: FacingMode,
    /// Viewports wider than this (in CSS pixels) ask the camera for HD frames.
    pub wide_viewport_breakpoint: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Sqlite,
            storage_key: DEFAULT_STORAGE_KEY.into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            display_locale: DEFAULT_DISPLAY_LOCALE.into(),
            preferred_facing: FacingMode::Environment,
            wide_viewport_breakpoint: DEFAULT_WIDE_VIEWPORT_BREAKPOINT,
        }
    }
}

impl AppConfig {
    /// Clamp values that would otherwise break encoding or persistence.
    pub fn normalized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.storage_key.trim().is_empty() {
            self.storage_key = DEFAULT_STORAGE_KEY.into();
        }
        if self.display_locale.trim().is_empty() {
            self.display_locale = DEFAULT_DISPLAY_LOCALE.into();
        }
        self
    }

    /// Apply `RECEIPTS_*` environment overrides. Unparsable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_STORAGE_KEY) {
            self.storage_key = key;
        }
        if let Some(quality) =
            lookup(ENV_JPEG_QUALITY).and_then(|raw| raw.trim().parse::<u32>().ok())
        {
            self.jpeg_quality = quality.clamp(1, 100) as u8;
        }
        if let Some(locale) = lookup(ENV_LOCALE) {
            self.display_locale = locale;
        }
        self.normalized()
    }
}

/// JSON-file backed configuration with in-memory caching.
pub struct ConfigStore {
    /// `None` keeps updates in memory only.
    path: Option<PathBuf>,
    data: RwLock<AppConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<AppConfig>(&contents).unwrap_or_default()
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data.with_env_overrides()),
        })
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            path: None,
            data: RwLock::new(config.normalized()),
        }
    }

    pub fn config(&self) -> AppConfig {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, config: AppConfig) -> Result<AppConfig> {
        let config = config.normalized();
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&config)?;
        *guard = config.clone();
        Ok(config)
    }

    fn persist(&self, data: &AppConfig) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json")).unwrap();
        let config = store.config();
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.preferred_facing, FacingMode::Environment);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::new(path).unwrap();
        assert_eq!(store.config().display_locale, DEFAULT_DISPLAY_LOCALE);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"displayLocale":"en-US","storageBackend":"sqlite"}"#).unwrap();
        let store = ConfigStore::new(path).unwrap();
        let config = store.config();
        assert_eq!(config.display_locale, "en-US");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
    }

    #[test]
    fn update_persists_normalized_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::new(path.clone()).unwrap();

        let saved = store
            .update(AppConfig {
                jpeg_quality: 0,
                storage_key: "  ".into(),
                ..AppConfig::default()
            })
            .unwrap();
        assert_eq!(saved.jpeg_quality, 1);
        assert_eq!(saved.storage_key, DEFAULT_STORAGE_KEY);

        let raw = fs::read_to_string(&path).unwrap();
        let reread: AppConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(reread, saved);
    }

    #[test]
    fn in_memory_store_updates_without_a_file() {
        let store = ConfigStore::in_memory(AppConfig::default());
        let saved = store
            .update(AppConfig {
                display_locale: "en-GB".into(),
                ..AppConfig::default()
            })
            .unwrap();
        assert_eq!(store.config(), saved);
        assert_eq!(store.config().display_locale, "en-GB");
    }

    #[test]
    fn overrides_replace_and_clamp() {
        let env: HashMap<&str, &str> = [
            (ENV_STORAGE_KEY, "receipts-test"),
            (ENV_JPEG_QUALITY, "250"),
            (ENV_LOCALE, "de-DE"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::default()
            .with_overrides(|name| env.get(name).map(|value| value.to_string()));
        assert_eq!(config.storage_key, "receipts-test");
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.display_locale, "de-DE");
    }

    #[test]
    fn unparsable_quality_override_is_ignored() {
        let config = AppConfig::default().with_overrides(|name| {
            (name == ENV_JPEG_QUALITY).then(|| "high".to_string())
        });
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }
}
