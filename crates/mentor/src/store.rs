//! JSON-file key-value store for the small amount of state the mentor keeps
//! between runs. Values are read and written whole.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Logged-in demo user record
pub const USER_KEY: &str = "mentor.user";
/// Auth marker token
pub const AUTH_KEY: &str = "mentor.auth";
/// Capped learning insight log
pub const INSIGHTS_KEY: &str = "mentor.insights";
/// Last mentor mode chosen by the user
pub const MODE_KEY: &str = "mentor.mode";

pub struct LocalStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, Value>>,
}

impl LocalStore {
    /// Open (or start) the store at `path`. A missing file is an empty store; a
    /// corrupt one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, Value>>(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "store file unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            values: Mutex::new(values),
        }
    }

    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// `None` when the key is absent or holds something other than a `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring stored value of unexpected shape");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("serialize {key}"))?;
        let snapshot = {
            let mut values = self.values.lock();
            values.insert(key.to_string(), value);
            values.clone()
        };
        self.flush(&snapshot)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let snapshot = {
            let mut values = self.values.lock();
            if values.remove(key).is_none() {
                return Ok(());
            }
            values.clone()
        };
        self.flush(&snapshot)
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(values)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
