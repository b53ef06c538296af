//! File-backed profile storage
//!
//! The full collection persists as a single JSON array, insertion order
//! preserved. Every mutating call rewrites the file through a temp-and-rename
//! cycle so a crash mid-write cannot leave a truncated document behind.

use crate::error::{StorageError, SwitchError, SwitchResult};
use crate::profile::types::{ProfileRecord, ToolFamily};
use crate::util::write_atomic;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Owns the authoritative profile collection
pub struct ProfileStore {
    path: PathBuf,
    records: Vec<ProfileRecord>,
}

impl ProfileStore {
    /// Open the store at `path`
    ///
    /// A missing file is an empty store; unreadable or unparsable content is
    /// surfaced rather than silently discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StorageError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            serde_json::from_str(&content).map_err(|e| StorageError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            Vec::new()
        };
        Ok(Self { path, records })
    }

    /// Snapshot of the collection, insertion order
    #[must_use]
    pub fn list(&self) -> Vec<ProfileRecord> {
        self.records.clone()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&ProfileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The record currently active for `family`, if any
    #[must_use]
    pub fn active_of(&self, family: ToolFamily) -> Option<&ProfileRecord> {
        self.records.iter().find(|r| r.family == family && r.active)
    }

    /// Append a new record (inactive) and persist
    pub fn add(
        &mut self,
        name: &str,
        family: ToolFamily,
        secret: String,
        endpoint: Option<String>,
    ) -> SwitchResult<ProfileRecord> {
        let name = validate_name(name)?;
        let record = ProfileRecord::new(name, family, secret, normalize_endpoint(endpoint));
        self.records.push(record.clone());
        self.persist()?;
        Ok(record)
    }

    /// Replace name/secret/endpoint in place and persist
    ///
    /// The family is fixed at creation; there is deliberately no way to
    /// change it here.
    pub fn update(
        &mut self,
        id: Uuid,
        name: &str,
        secret: String,
        endpoint: Option<String>,
    ) -> SwitchResult<ProfileRecord> {
        let name = validate_name(name)?;
        let endpoint = normalize_endpoint(endpoint);
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(SwitchError::NotFound(id))?;
        record.name = name;
        record.secret = secret;
        record.endpoint = endpoint;
        let updated = record.clone();
        self.persist()?;
        Ok(updated)
    }

    /// Remove a record and persist
    ///
    /// The caller is responsible for clearing the record's surface first when
    /// it is active.
    pub fn remove(&mut self, id: Uuid) -> SwitchResult<ProfileRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(SwitchError::NotFound(id))?;
        let removed = self.records.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Flip an active flag in memory
    ///
    /// Does not persist and does not enforce the one-active-per-family
    /// invariant; both belong to the activation engine, which commits with an
    /// explicit [`ProfileStore::persist`] only once the backend succeeded.
    pub fn set_active(&mut self, id: Uuid, value: bool) -> SwitchResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(SwitchError::NotFound(id))?;
        record.active = value;
        Ok(())
    }

    /// Rewrite the backing file atomically
    pub fn persist(&self) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(&self.records).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            message: format!("failed to serialize profile collection: {e}"),
        })?;
        write_atomic(&self.path, &content).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn validate_name(name: &str) -> SwitchResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SwitchError::Validation(
            "profile name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// An empty endpoint means "use the tool default"
pub(crate) fn normalize_endpoint(endpoint: Option<String>) -> Option<String> {
    endpoint
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}
