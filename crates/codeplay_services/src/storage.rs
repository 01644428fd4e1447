//! Snapshot storage
//!
//! A small string key-value store in the shape of a browser's local storage,
//! and the autosave snapshot kept in it.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use codeplay_core::SourceTriple;

use crate::error::ServiceError;

/// Key the autosave snapshot is stored under.
pub const AUTOSAVE_KEY: &str = "codeplay-autosave";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ServiceError>;
    fn remove(&mut self, key: &str) -> Result<(), ServiceError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ServiceError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), ServiceError> {
        (**self).remove(key)
    }
}

/// Store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ServiceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON file holding a map of key to string.
///
/// The file is read once on open and rewritten whole on every change,
/// through a temporary file in the same directory and a rename. A failed
/// write leaves the previous file and no temporary behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| ServiceError::StorageFormat {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(ServiceError::StorageIo { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "storage opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), ServiceError> {
        let io_error = |source: std::io::Error| ServiceError::StorageIo {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&self.entries)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Dropping the temporary file on any early return deletes it.
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
        tmp.write_all(json.as_bytes()).map_err(io_error)?;
        tmp.as_file().sync_all().map_err(io_error)?;
        tmp.persist(&self.path).map_err(|err| io_error(err.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), ServiceError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// Stored snapshot; older snapshots may lack parts.
#[derive(Deserialize)]
struct Snapshot {
    html: Option<String>,
    css: Option<String>,
    js: Option<String>,
}

/// Writes `sources` as the autosave snapshot, replacing the previous one.
pub fn autosave<S: KeyValueStore + ?Sized>(
    store: &mut S,
    sources: &SourceTriple,
) -> Result<(), ServiceError> {
    autosave_under(store, AUTOSAVE_KEY, sources)
}

pub fn autosave_under<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &str,
    sources: &SourceTriple,
) -> Result<(), ServiceError> {
    let json = serde_json::to_string(sources)?;
    store.set(key, &json)?;
    debug!(key, bytes = json.len(), "snapshot saved");
    Ok(())
}

/// The autosave snapshot, if there is a readable one.
pub fn load_autosave<S: KeyValueStore + ?Sized>(store: &S) -> Option<SourceTriple> {
    load_autosave_under(store, AUTOSAVE_KEY)
}

pub fn load_autosave_under<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<SourceTriple> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(%err, key, "snapshot could not be read");
            return None;
        }
    };
    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) => Some(SourceTriple::from_parts(snapshot.html, snapshot.css, snapshot.js)),
        Err(err) => {
            warn!(%err, key, "ignoring malformed snapshot");
            None
        }
    }
}

/// Drops the autosave snapshot.
pub fn clear_autosave<S: KeyValueStore + ?Sized>(store: &mut S, key: &str) -> Result<(), ServiceError> {
    store.remove(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeplay_core::templates::DEFAULT_CSS;

    #[test]
    fn test_autosave_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(load_autosave(&store), None);

        let sources = SourceTriple::new("<p>é</p>", "", "let x = '日本';");
        autosave(&mut store, &sources).unwrap();
        assert_eq!(load_autosave(&store), Some(sources));

        let newer = SourceTriple::new("<p>2</p>", "b{}", "");
        autosave(&mut store, &newer).unwrap();
        assert_eq!(load_autosave(&store), Some(newer));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_malformed_snapshot_is_ignored() {
        let mut store = MemoryStore::new();
        store.set(AUTOSAVE_KEY, "{broken").unwrap();
        assert_eq!(load_autosave(&store), None);
    }

    #[test]
    fn test_snapshot_missing_fields_default() {
        let mut store = MemoryStore::new();
        store.set(AUTOSAVE_KEY, r#"{"html":"<i>x</i>","js":""}"#).unwrap();
        let loaded = load_autosave(&store).unwrap();
        assert_eq!(loaded.html, "<i>x</i>");
        assert_eq!(loaded.css, DEFAULT_CSS);
        assert_eq!(loaded.js, "");
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(AUTOSAVE_KEY).unwrap(), None);
        autosave(&mut store, &SourceTriple::new("a", "b", "c")).unwrap();
        store.set("other", "value").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(load_autosave(&reopened), Some(SourceTriple::new("a", "b", "c")));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("value"));
        assert_eq!(dir_names(dir.path()), vec!["storage.json".to_string()]);

        let mut reopened = reopened;
        clear_autosave(&mut reopened, AUTOSAVE_KEY).unwrap();
        assert_eq!(load_autosave(&FileStore::open(&path).unwrap()), None);
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_failed_write_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = FileStore::open(&path).unwrap();

        // A non-empty directory where the file should go makes the rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let err = store.set("key", "value").unwrap_err();
        assert!(matches!(err, ServiceError::StorageIo { .. }));
        assert_eq!(dir_names(dir.path()), vec!["storage.json".to_string()]);
        assert_eq!(dir_names(&path), vec!["keep".to_string()]);
    }

    #[test]
    fn test_file_store_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(ServiceError::StorageFormat { .. })
        ));
    }
}
