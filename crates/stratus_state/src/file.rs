//! File-backed state store.
//!
//! One JSON document per logical name under the state directory.
//! Upserts go through a temp file in the same directory followed by an
//! atomic rename, so a crash mid-run leaves every completed entry
//! durable and never a half-written record.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::record::StateRecord;
use crate::store::StateStore;

/// State store persisting records as `<dir>/<logical-name>.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StateResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the record file for a logical name.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn read_record(path: &Path) -> StateResult<StateRecord> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| StateError::CorruptRecord {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read_all(&self) -> StateResult<HashMap<String, StateRecord>> {
        let mut records = HashMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let record = Self::read_record(&path)?;
                records.insert(record.name.clone(), record);
            }
        }
        debug!("Loaded {} state records from {:?}", records.len(), self.dir);
        Ok(records)
    }

    async fn get(&self, name: &str) -> StateResult<Option<StateRecord>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::read_record(&path)?))
    }

    async fn upsert(&self, record: StateRecord) -> StateResult<()> {
        let path = self.record_path(&record.name);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            StateError::WriteFailed {
                name: record.name.clone(),
                message: e.to_string(),
            }
        })?;
        fs::write(tmp.path(), json)?;
        tmp.persist(&path).map_err(|e| StateError::WriteFailed {
            name: record.name.clone(),
            message: e.to_string(),
        })?;

        debug!("Persisted state record for '{}' to {:?}", record.name, path);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StateResult<()> {
        let path = self.record_path(name);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed state record for '{}'", name);
        }
        Ok(())
    }
}
