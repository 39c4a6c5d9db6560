use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::path::PagePath;
use crate::store::{DocumentStore, PageRecord, StoreOptions};

const APP_HOME_DIR: &str = ".atelier";
const SESSION_FILE: &str = "session.json";

/// On-disk shape of a saved editing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<PagePath>,
    #[serde(default)]
    pub pages: BTreeMap<PagePath, PageRecord>,
}

/// `~/.atelier/session.json`, or `session.json` in the working directory
/// when no home directory is known.
pub fn default_session_path() -> PathBuf {
    match dirs::home_dir() {
        Some(mut home) => {
            home.push(APP_HOME_DIR);
            home.push(SESSION_FILE);
            home
        }
        None => PathBuf::from(SESSION_FILE),
    }
}

impl DocumentStore {
    pub fn snapshot(&self) -> SessionFile {
        SessionFile {
            active: self.active.clone(),
            pages: self.pages.clone(),
        }
    }

    /// Rebuild a store from a snapshot. Histories are brought back to a
    /// consistent shape and an unknown active page falls back to the first.
    pub fn restore(snapshot: SessionFile, options: StoreOptions) -> Self {
        let mut store = DocumentStore::new(options);
        for (path, mut record) in snapshot.pages {
            record.history.repair();
            record.history.set_limit(store.options.history_limit);
            store
                .normalizer
                .remember(path.as_str(), &record.history.current().code);
            store.pages.insert(path, record);
        }
        store.active = snapshot
            .active
            .filter(|path| store.pages.contains_key(path))
            .or_else(|| store.first_page().cloned());
        store
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|source| {
            StoreError::Serde {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(?path, pages = self.pages.len(), "session saved");
        Ok(())
    }

    pub fn load(path: &Path, options: StoreOptions) -> Result<Self> {
        let data = fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: SessionFile = serde_json::from_slice(&data).map_err(|source| {
            warn!(?source, ?path, "failed to parse session file");
            StoreError::Serde {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::restore(snapshot, options))
    }
}
