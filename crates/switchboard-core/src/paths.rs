//! Fixed per-user locations
//!
//! The profile collection and the merged router document live under
//! `~/.switchboard/`; each file-backed tool family has its own credential
//! file in the tool's dotfolder.

use crate::error::StorageError;
use std::path::PathBuf;

/// Resolve the user's home directory
///
/// Prefers `HOME` (Unix), then `USERPROFILE` (Windows), then the platform
/// default.
pub fn home_dir() -> Result<PathBuf, StorageError> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Ok(PathBuf::from(userprofile));
    }
    dirs::home_dir().ok_or(StorageError::NoHomeDir)
}

/// Application data directory (`~/.switchboard`)
pub fn data_dir() -> Result<PathBuf, StorageError> {
    Ok(home_dir()?.join(".switchboard"))
}

/// The persisted profile collection
pub fn profiles_path() -> Result<PathBuf, StorageError> {
    Ok(data_dir()?.join("profiles.json"))
}

/// The merged router document consumed by the LLM router
pub fn router_config_path() -> Result<PathBuf, StorageError> {
    Ok(data_dir()?.join("router.json"))
}

/// Codex credential file
pub fn codex_auth_path() -> Result<PathBuf, StorageError> {
    Ok(home_dir()?.join(".codex").join("auth.json"))
}

/// Gemini credential file
pub fn gemini_credentials_path() -> Result<PathBuf, StorageError> {
    Ok(home_dir()?.join(".gemini").join("credentials.json"))
}
