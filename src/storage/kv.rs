use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use crate::models::error::TrackerError;

/// Durable string key-value records holding JSON values.
///
/// There is no locking across keys: each operation is an independent
/// read-modify-write, so concurrent writers on one key are last-write-wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TrackerError>;
    fn set(&self, key: &str, value: String) -> Result<(), TrackerError>;
    fn remove(&self, key: &str) -> Result<(), TrackerError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Reads a JSON record, treating a missing or unparseable value as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, TrackerError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Record {} is malformed, treating it as absent: {}", key, e);
            Ok(None)
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), TrackerError> {
    store.set(key, serde_json::to_string(value)?)
}

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrackerError> {
        Ok(self.records.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), TrackerError> {
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TrackerError> {
        self.records.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per record under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, TrackerError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self { dir: dir.as_ref().to_path_buf() })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrackerError> {
        let data = match fs::read(self.path_for(key)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match String::from_utf8(data) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                warn!("Record {} is not valid UTF-8, treating it as absent: {}", key, e);
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), TrackerError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TrackerError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
