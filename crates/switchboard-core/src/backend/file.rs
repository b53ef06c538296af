//! JSON-file backends for the Codex and Gemini families
//!
//! Each family owns one credential document at a fixed per-user path. Apply
//! regenerates the whole document; clear deletes it.

use super::ActivationBackend;
use crate::error::BackendError;
use crate::profile::{ProfileRecord, ToolFamily};
use crate::util::write_atomic;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a family's credential document at a fixed per-user path
pub struct JsonFileBackend {
    family: ToolFamily,
    path: PathBuf,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(family: ToolFamily, path: PathBuf) -> Self {
        Self { family, path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn surface(&self) -> String {
        self.path.display().to_string()
    }
}

impl ActivationBackend for JsonFileBackend {
    fn family(&self) -> ToolFamily {
        self.family
    }

    fn apply(&self, record: &ProfileRecord) -> Result<(), BackendError> {
        let keys = self.family.keys();
        let mut doc = Map::new();
        doc.insert(
            keys.secret_key.to_string(),
            Value::String(record.secret.clone()),
        );
        // An absent endpoint omits the key; the tool falls back to its default.
        if let Some(endpoint) = &record.endpoint {
            doc.insert(keys.endpoint_key.to_string(), Value::String(endpoint.clone()));
        }

        let content = serde_json::to_vec_pretty(&Value::Object(doc))
            .map_err(|e| BackendError::encoding(self.surface(), e.to_string()))?;
        write_atomic(&self.path, &content).map_err(|e| BackendError::io(self.surface(), &e))
    }

    fn clear(&self) -> Result<(), BackendError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::io(self.surface(), &e)),
        }
    }
}
