use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Durable string key-value storage shared by the auth store and the quiz
/// timers.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.lock().expect("memory store mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// Whole map kept in memory and rewritten to a JSON file on every change.
///
/// Inside a tokio runtime the file write runs on the blocking pool, so
/// callers holding other locks only pay for serializing the map. Call
/// [`FileStore::flush`] before exit to make the latest state durable.
#[derive(Debug)]
pub struct FileStore {
    entries: Mutex<Versioned>,
    writer: Arc<Writer>,
}

#[derive(Debug, Default)]
struct Versioned {
    map: HashMap<String, String>,
    version: u64,
}

#[derive(Debug)]
struct Writer {
    path: PathBuf,
    written: Mutex<u64>,
}

impl Writer {
    /// Writes `bytes` unless a newer snapshot already reached disk.
    fn write(&self, version: u64, bytes: &[u8]) -> Result<()> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| Error::Storage("Storage writer lock poisoned".to_string()))?;
        if version <= *written {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        *written = version;
        Ok(())
    }
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Storage(format!("Corrupt storage file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        tracing::info!("Opened storage at {} ({} keys)", path.display(), map.len());
        Ok(Self {
            entries: Mutex::new(Versioned { map, version: 0 }),
            writer: Arc::new(Writer {
                path,
                written: Mutex::new(0),
            }),
        })
    }

    /// Synchronously writes the current state.
    pub fn flush(&self) -> Result<()> {
        let (version, bytes) = {
            let guard = self.entries.lock().expect("file store mutex poisoned");
            (guard.version, serde_json::to_vec_pretty(&guard.map)?)
        };
        self.writer.write(version, &bytes)
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<()> {
        let (version, bytes) = {
            let mut guard = self.entries.lock().expect("file store mutex poisoned");
            if !f(&mut guard.map) {
                return Ok(());
            }
            guard.version += 1;
            (guard.version, serde_json::to_vec_pretty(&guard.map)?)
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let writer = self.writer.clone();
                handle.spawn_blocking(move || {
                    if let Err(e) = writer.write(version, &bytes) {
                        tracing::error!(error = %e, path = %writer.path.display(), "Failed to write storage file");
                    }
                });
                Ok(())
            }
            Err(_) => self.writer.write(version, &bytes),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.lock().expect("file store mutex poisoned");
        Ok(guard.map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| map.remove(key).is_some())
    }
}
