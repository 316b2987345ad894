pub mod camera;
pub mod models;
pub mod receipts;
pub mod settings;
pub mod storage;
pub mod store;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};

use camera::{CaptureSession, FrameEncoder, MediaDevices};
use receipts::ReceiptController;
use settings::{AppConfig, ConfigStore, StorageBackend};
use storage::{FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage};
use store::RecordStore;

pub use utils::init_logging;

const SETTINGS_FILE: &str = "settings.json";
const SQLITE_FILE: &str = "receipts.sqlite3";
const FILE_STORAGE_DIR: &str = "storage";

/// Everything the UI layer needs, built once and passed to the command
/// functions in [`receipts::commands`].
pub struct ReceiptContext {
    config: AppConfig,
    settings: ConfigStore,
    controller: ReceiptController,
}

impl ReceiptContext {
    /// Wire up a context whose settings are kept in memory only.
    pub fn new(
        config: AppConfig,
        devices: Arc<dyn MediaDevices>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let settings = ConfigStore::in_memory(config);
        Self::with_settings(settings, devices, storage)
    }

    fn with_settings(
        settings: ConfigStore,
        devices: Arc<dyn MediaDevices>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let config = settings.config();
        let session = CaptureSession::new(devices, FrameEncoder::new(config.jpeg_quality))
            .with_viewport_breakpoint(config.wide_viewport_breakpoint);
        let store = RecordStore::open(storage, config.storage_key.clone());
        let controller = ReceiptController::new(session, store, &config);

        Self {
            config,
            settings,
            controller,
        }
    }

    /// Load `settings.json` from `data_dir`, open the configured storage
    /// backend there and wire up the controller.
    ///
    /// A storage backend that cannot be opened is replaced by in-memory
    /// storage for this run.
    pub fn open(data_dir: &Path, devices: Arc<dyn MediaDevices>) -> Result<Self> {
        init_logging();
        info!("Receipt capture starting up...");

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config_store = ConfigStore::new(data_dir.join(SETTINGS_FILE))?;
        let config = config_store.config();

        let storage = match open_storage(data_dir, config.storage_backend) {
            Ok(storage) => storage,
            Err(err) => {
                warn!("Receipt storage unavailable, receipts will not persist: {err:#}");
                Arc::new(MemoryStorage::new())
            }
        };

        Ok(Self::with_settings(config_store, devices, storage))
    }

    /// Settings this context was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Saved settings. Updates take effect the next time a context is opened.
    pub fn settings(&self) -> &ConfigStore {
        &self.settings
    }

    pub fn controller(&self) -> &ReceiptController {
        &self.controller
    }
}

fn open_storage(data_dir: &Path, backend: StorageBackend) -> Result<Arc<dyn KeyValueStorage>> {
    let storage: Arc<dyn KeyValueStorage> = match backend {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::new(data_dir.join(SQLITE_FILE))?),
        StorageBackend::File => Arc::new(FileStorage::new(data_dir.join(FILE_STORAGE_DIR))?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}
