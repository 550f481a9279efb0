use std::env::current_exe;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str;
use std::sync::{Arc, Mutex};
use directories_next::ProjectDirs;
use fd_lock::{RwLock, RwLockWriteGuard};
use log::{info, warn};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::config::types::Config;
use crate::error::ConfigError;

const CONFIG_FILE_NAME: &str = "vitals-monitor.json";

// vitals-monitor.exe => vitals-monitor.json, next to the executable.
// Only used if that file already exists, handy when running from a usb stick.
fn get_portable_config_path() -> Option<PathBuf> {
    let mut path = match current_exe() {
        Ok(path) => path,
        Err(err) => {
            warn!("Failed to get current exe path: {:?}", err);
            return None;
        },
    };

    if !path.set_extension("json") {
        warn!("Current exe has no file name: {}", path.to_string_lossy());
        return None;
    }

    match std::fs::metadata(&path) {
        Ok(attr) if attr.is_file() => Some(path),
        Ok(_) => None,
        Err(_) => None,
    }
}

// e.g. ~/.config/vitals-monitor/vitals-monitor.json or %AppData% on windows
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "vitals-monitor", "vitals-monitor")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    get_portable_config_path()
        .or_else(get_local_config_path)
        .ok_or(ConfigError::NoConfigPath)
}

/// Holds the exclusive lock that keeps a second instance (and so a second session) from starting.
pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        self.rw_lock.try_write().map_err(|source| ConfigError::CanNotLock { source })
    }
}

#[derive(Clone)]
pub struct ConfigIO {
    file: Arc<Mutex<std::fs::File>>,
}

impl ConfigIO {
    pub fn new_sync() -> Result<Self, ConfigError> {
        let path = get_config_path()?;
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            std::fs::create_dir_all(directory)?;
        }

        Self::open_sync(path)
    }

    pub fn open_sync(path: PathBuf) -> Result<Self, ConfigError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .create(true)
            .open(path)?;

        Ok(ConfigIO { file: Arc::new(Mutex::new(file)) })
    }

    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(self.clone_file()?),
        })
    }

    fn clone_file(&self) -> Result<std::fs::File, ConfigError> {
        // a poisoned lock still guards a perfectly usable file handle
        let file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(file.try_clone()?)
    }

    // The File returned from here shares its cursor with the original; always rewind first.
    fn get_file(&self) -> Result<File, ConfigError> {
        Ok(File::from_std(self.clone_file()?))
    }

    /// Reads the config; an empty (freshly created) file is filled with the defaults so that
    /// deployments have something to edit.
    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        info!("Reading config file");

        let mut content = vec![];
        file.rewind().await?;
        file.read_to_end(&mut content).await?;

        if content.iter().all(u8::is_ascii_whitespace) {
            info!("Config file is empty, writing defaults");
            let config = Config::default();
            self.save(&config).await?;
            return Ok(config);
        }

        let content = str::from_utf8(&content)?;
        Ok(serde_json::from_str(content)?)
    }

    pub async fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        info!("Saving config");

        let content = serde_json::to_string_pretty(config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
