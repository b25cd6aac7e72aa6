use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::SettingsKey;

type Document = BTreeMap<String, serde_json::Value>;

/// Raw key-value storage for settings. Values are JSON text.
///
/// `read_all` must return a copy, so a caller pricing a quote never observes a
/// write that lands halfway through its computation.
pub trait SettingsStore: Send + Sync {
    fn read_all(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError>;
    fn write_all(&self, entries: BTreeMap<SettingsKey, String>) -> Result<(), SettingsStoreError>;
    fn remove(&self, key: SettingsKey) -> Result<(), SettingsStoreError>;
}

/// Error enumeration for settings storage failures.
#[derive(Debug, thiserror::Error)]
pub enum SettingsStoreError {
    #[error("settings storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file at {path} is not a valid settings document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default, Clone)]
pub struct InMemorySettingsStore {
    entries: Arc<Mutex<BTreeMap<SettingsKey, String>>>,
}

impl InMemorySettingsStore {
    pub fn with_entries(entries: BTreeMap<SettingsKey, String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<SettingsKey, String>>, SettingsStoreError> {
        self.entries
            .lock()
            .map_err(|_| SettingsStoreError::Unavailable("settings mutex poisoned".to_string()))
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn read_all(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError> {
        Ok(self.lock()?.clone())
    }

    fn write_all(&self, entries: BTreeMap<SettingsKey, String>) -> Result<(), SettingsStoreError> {
        self.lock()?.extend(entries);
        Ok(())
    }

    fn remove(&self, key: SettingsKey) -> Result<(), SettingsStoreError> {
        self.lock()?.remove(&key);
        Ok(())
    }
}

/// Settings persisted as a single JSON object keyed by setting name.
///
/// Reads tolerate a file that no longer parses and fall back to defaults.
/// Writes refuse to touch it, so a hand-edited typo never costs the stored
/// overrides.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SettingsStoreError {
        SettingsStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_document(&self) -> Result<Option<Result<Document, serde_json::Error>>, SettingsStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    /// Lenient load used for reads: an unparseable file counts as empty.
    fn load(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError> {
        match self.read_document()? {
            None => Ok(BTreeMap::new()),
            Some(Ok(document)) => Ok(Self::entries(document)),
            Some(Err(err)) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unparseable settings file");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Strict load used before rewriting the file.
    fn load_for_update(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError> {
        match self.read_document()? {
            None => Ok(BTreeMap::new()),
            Some(Ok(document)) => Ok(Self::entries(document)),
            Some(Err(source)) => Err(SettingsStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn entries(document: Document) -> BTreeMap<SettingsKey, String> {
        let mut entries = BTreeMap::new();
        for (name, value) in document {
            match SettingsKey::parse(&name) {
                Some(key) => {
                    entries.insert(key, value.to_string());
                }
                None => warn!(setting = %name, "ignoring unknown settings key"),
            }
        }
        entries
    }

    fn save(&self, entries: &BTreeMap<SettingsKey, String>) -> Result<(), SettingsStoreError> {
        let mut document = serde_json::Map::new();
        for (key, raw) in entries {
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
            document.insert(key.as_str().to_string(), value);
        }

        let contents = serde_json::to_string_pretty(&serde_json::Value::Object(document))?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        fs::write(&self.path, contents).map_err(|err| self.io_error(err))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, SettingsStoreError> {
        self.write_lock
            .lock()
            .map_err(|_| SettingsStoreError::Unavailable("settings file lock poisoned".to_string()))
    }
}

impl SettingsStore for FileSettingsStore {
    fn read_all(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError> {
        let _guard = self.guard()?;
        self.load()
    }

    fn write_all(&self, entries: BTreeMap<SettingsKey, String>) -> Result<(), SettingsStoreError> {
        let _guard = self.guard()?;
        let mut current = self.load_for_update()?;
        current.extend(entries);
        self.save(&current)
    }

    fn remove(&self, key: SettingsKey) -> Result<(), SettingsStoreError> {
        let _guard = self.guard()?;
        let mut current = self.load_for_update()?;
        if current.remove(&key).is_some() {
            self.save(&current)?;
        }
        Ok(())
    }
}
