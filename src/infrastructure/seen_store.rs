//! JSON file backed seen-set store
//!
//! The state file is only ever replaced whole: the new content goes to a
//! temporary file in the same directory, is flushed to disk, then renamed
//! over the old file. A crash at any point leaves either the previous or the
//! new state readable.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::domain::{PersistError, Product, SeenEntry, SeenSet, SeenStore};

pub struct JsonFileSeenStore {
    path: PathBuf,
    set: SeenSet,
    dirty: bool,
}

impl JsonFileSeenStore {
    /// Load the state file. A missing file means first run and yields an
    /// empty set; an unreadable or corrupt file is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();

        let set = match fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📦 No state file at {:?}, starting with an empty seen-set", path);
                SeenSet::new()
            }
            Err(source) => return Err(PersistError::Read { path, source }),
        };

        debug!("Loaded {} seen identifiers from {:?}", set.len(), path);
        Ok(Self {
            path,
            set,
            dirty: false,
        })
    }

    /// Like [`load`](Self::load), but when `path` does not exist yet and a
    /// state file from an older install sits at `legacy`, its entries are
    /// taken over. The store starts dirty so the next persist writes `path`;
    /// the legacy file is left untouched.
    pub fn load_with_fallback(path: impl Into<PathBuf>, legacy: &Path) -> Result<Self, PersistError> {
        let path = path.into();
        if path.exists() || path == legacy {
            return Self::load(path);
        }

        let set = match fs::read(legacy) {
            Ok(bytes) => decode(legacy, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::load(path),
            Err(source) => {
                return Err(PersistError::Read {
                    path: legacy.to_path_buf(),
                    source,
                })
            }
        };

        info!(
            "📦 Migrating {} seen products from {:?} to {:?}",
            set.len(),
            legacy,
            path
        );
        let dirty = !set.is_empty();
        Ok(Self { path, set, dirty })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seen_set(&self) -> &SeenSet {
        &self.set
    }

    fn write_atomically(&self) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source| PersistError::Write {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(write_err)?;

        let bytes = serde_json::to_vec_pretty(&self.set)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        sync_directory(&dir);
        Ok(())
    }
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_directory(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!("⚠️ Could not sync directory {:?}: {}", dir, e);
    }
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) {}

impl SeenStore for JsonFileSeenStore {
    fn is_new(&self, id: &str) -> bool {
        !self.set.contains(id)
    }

    fn mark_seen(&mut self, ids: &[&str]) {
        for id in ids {
            if self.set.insert((*id).to_string(), SeenEntry::bare()) {
                self.dirty = true;
            }
        }
    }

    fn mark_product_seen(&mut self, product: &Product) {
        if self.set.insert(product.id.clone(), SeenEntry::for_product(product)) {
            self.dirty = true;
        }
    }

    fn persist(&mut self) -> Result<(), PersistError> {
        self.write_atomically()?;
        self.dirty = false;
        info!("💾 Saved {} seen products to {:?}", self.set.len(), self.path);
        Ok(())
    }

    fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    fn len(&self) -> usize {
        self.set.len()
    }
}

/// Keyed object format, or a legacy plain array of identifiers
fn decode(path: &Path, bytes: &[u8]) -> Result<SeenSet, PersistError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| PersistError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let corrupt = |e: serde_json::Error| PersistError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    match value {
        serde_json::Value::Array(_) => {
            let ids: Vec<String> = serde_json::from_value(value).map_err(corrupt)?;
            Ok(SeenSet::from_identifiers(ids))
        }
        serde_json::Value::Object(_) => serde_json::from_value(value).map_err(corrupt),
        other => Err(PersistError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("expected an object or array, found {other}"),
        }),
    }
}
