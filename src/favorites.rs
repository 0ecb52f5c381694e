use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde_json::Value;

use crate::apod::Item;

/// Where the serialized favorites map lives between sessions.
pub trait FavoritesBackend: Send {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FavoritesBackend for FileBackend {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("favorites: read {}", self.path.display())),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("favorites: create directory {}", parent.display())
            })?;
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("favorites: write {}", self.path.display()))
    }
}

/// Session-only storage. Keeps every write so callers can inspect the
/// persisted history, and can be switched to reject writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    initial: Option<String>,
    writes: Vec<String>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let backend = Self::default();
        backend.inner.lock().initial = Some(contents.into());
        backend
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn writes(&self) -> Vec<String> {
        self.inner.lock().writes.clone()
    }
}

impl FavoritesBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        let state = self.inner.lock();
        Ok(state.writes.last().cloned().or_else(|| state.initial.clone()))
    }

    fn write(&self, contents: &str) -> Result<()> {
        let mut state = self.inner.lock();
        if state.fail_writes {
            bail!("favorites: storage quota exceeded");
        }
        state.writes.push(contents.to_string());
        Ok(())
    }
}

pub struct FavoritesStore {
    map: BTreeMap<String, bool>,
    backend: Box<dyn FavoritesBackend>,
}

impl FavoritesStore {
    /// Reads the persisted map. Missing or unreadable data starts an empty
    /// map; this never fails.
    pub fn load(backend: Box<dyn FavoritesBackend>) -> Self {
        let map = match backend.read() {
            Ok(Some(raw)) => parse_map(&raw).unwrap_or_else(|| {
                tracing::warn!("Ignoring malformed favorites data");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(error = ?err, "Could not read favorites");
                BTreeMap::new()
            }
        };
        Self { map, backend }
    }

    pub fn in_memory() -> Self {
        Self::load(Box::<MemoryBackend>::default())
    }

    pub fn is_favorited(&self, item: &Item) -> bool {
        item.date_key()
            .is_some_and(|key| self.map.get(key).copied().unwrap_or(false))
    }

    /// Flips the favorite flag for the item's date and saves the whole map.
    /// Returns the new state; undated items are never favorites.
    pub fn toggle(&mut self, item: &Item) -> bool {
        let Some(key) = item.date_key() else {
            return false;
        };
        let now_favorited = if self.map.remove(key).is_some() {
            false
        } else {
            self.map.insert(key.to_string(), true);
            true
        };
        self.save();
        now_favorited
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn save(&self) {
        let result = serde_json::to_string(&self.map)
            .context("favorites: serialize")
            .and_then(|contents| self.backend.write(&contents));
        if let Err(err) = result {
            tracing::warn!(error = ?err, "Could not save favorites");
        }
    }
}

fn parse_map(raw: &str) -> Option<BTreeMap<String, bool>> {
    if raw.trim().is_empty() {
        return Some(BTreeMap::new());
    }
    let value: Value = serde_json::from_str(raw).ok()?;
    match value {
        Value::Object(entries) => Some(
            entries
                .into_iter()
                .filter(|(_, flag)| !matches!(flag, Value::Null | Value::Bool(false)))
                .map(|(key, _)| (key, true))
                .collect(),
        ),
        Value::Null => Some(BTreeMap::new()),
        _ => None,
    }
}
