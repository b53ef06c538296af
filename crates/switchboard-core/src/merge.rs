//! Merged router document
//!
//! A secondary consumer (an LLM router) reads one combined document with a
//! section per tool family. The document is regenerated wholesale on every
//! call and atomically replaced; it is never patched in place.

use crate::error::{BackendError, SwitchError, SwitchResult};
use crate::profile::ProfileRecord;
use crate::util::write_atomic;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Serializes selected profiles into the combined router document
pub struct MergeWriter {
    path: PathBuf,
}

impl MergeWriter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one section per record and atomically replace the document
    ///
    /// Records must belong to distinct families; the engine resolves the
    /// caller's selection down to at most one record per family before
    /// handing it over.
    pub fn write(&self, records: &[ProfileRecord]) -> SwitchResult<()> {
        if records.is_empty() {
            return Err(SwitchError::Validation(
                "merge selection resolves to no profiles".to_string(),
            ));
        }

        let mut doc = Map::new();
        for record in records {
            let keys = record.family.keys();
            let mut section = Map::new();
            section.insert(
                keys.secret_key.to_string(),
                Value::String(record.secret.clone()),
            );
            if let Some(endpoint) = &record.endpoint {
                section.insert(keys.endpoint_key.to_string(), Value::String(endpoint.clone()));
            }
            doc.insert(keys.section.to_string(), Value::Object(section));
        }

        let surface = self.path.display().to_string();
        let content = serde_json::to_vec_pretty(&Value::Object(doc))
            .map_err(|e| BackendError::encoding(surface.clone(), e.to_string()))?;
        write_atomic(&self.path, &content).map_err(|e| BackendError::io(surface, &e))?;
        Ok(())
    }
}
