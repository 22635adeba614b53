//!
//! camwatch session storage
//! ------------------------
//! A scoped key-value store that survives process restarts. The authenticator keeps
//! exactly one serialized identity under `CURRENT_USER_KEY`; preferences keep the
//! theme and language under their own keys.
//!
//! Two backends are provided:
//! - `MemoryStorage`: a `parking_lot::Mutex<HashMap>` for tests and ephemeral runs.
//! - `FileStorage`: one JSON document per key under a root directory.
//!
//! Handles are usually shared as `SharedStorage` (`Arc<dyn SessionStorage>`).

use std::{fs, path::{Path, PathBuf}};
use std::collections::HashMap;
use std::sync::Arc;
use anyhow::{Result, Context};
use parking_lot::Mutex;
use tracing::debug;

/// Key holding the persisted identity record.
pub const CURRENT_USER_KEY: &str = "currentUser";

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

pub type SharedStorage = Arc<dyn SessionStorage>;

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
    pub fn shared() -> SharedStorage { Arc::new(Self::new()) }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// File-backed storage rooted at a directory; each key maps to `<root>/<key>.json`.
#[derive(Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// The directory is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create or access storage root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root_path(&self) -> &PathBuf { &self.root }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let p = self.key_path(key);
        if !p.exists() { return Ok(None); }
        let text = fs::read_to_string(&p).with_context(|| format!("reading {}", p.display()))?;
        Ok(Some(text))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let p = self.key_path(key);
        // write-then-rename so a reader never sees a torn record
        let tmp = p.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &p).with_context(|| format!("renaming into {}", p.display()))?;
        debug!(target: "camwatch::storage", "set key='{}' path='{}' bytes={}", key, p.display(), value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let p = self.key_path(key);
        match fs::remove_file(&p) {
            Ok(()) => {
                debug!(target: "camwatch::storage", "remove key='{}' path='{}'", key, p.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", p.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_set_get_remove() {
        let s = MemoryStorage::new();
        assert_eq!(s.get("k").unwrap(), None);
        s.set("k", "v1").unwrap();
        s.set("k", "v2").unwrap();
        assert_eq!(s.get("k").unwrap().as_deref(), Some("v2"));
        s.remove("k").unwrap();
        s.remove("k").unwrap();
        assert_eq!(s.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() -> Result<()> {
        let tmp = tempdir()?;
        {
            let s = FileStorage::new(tmp.path())?;
            s.set(CURRENT_USER_KEY, "{\"id\":\"1\"}")?;
        }
        let s = FileStorage::new(tmp.path())?;
        assert_eq!(s.get(CURRENT_USER_KEY)?.as_deref(), Some("{\"id\":\"1\"}"));
        assert!(tmp.path().join("currentUser.json").exists());
        s.remove(CURRENT_USER_KEY)?;
        assert_eq!(s.get(CURRENT_USER_KEY)?, None);
        // second remove is a no-op
        s.remove(CURRENT_USER_KEY)?;
        Ok(())
    }

    #[test]
    fn file_storage_keys_cannot_escape_root() -> Result<()> {
        let tmp = tempdir()?;
        let s = FileStorage::new(tmp.path().join("inner"))?;
        s.set("../evil", "x")?;
        assert!(tmp.path().join("inner").join("___evil.json").exists());
        assert!(!tmp.path().join("evil.json").exists());
        Ok(())
    }
}
