//! Error types for the profile engine

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Result type for engine operations
pub type SwitchResult<T> = Result<T, SwitchError>;

/// Errors surfaced to the presentation layer
///
/// Every operation either fully succeeds or returns one of these with the
/// prior store and surface state intact.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// Malformed input (empty name, empty merge selection, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown profile id
    #[error("Profile not found: {0}")]
    NotFound(Uuid),

    /// Failure writing or clearing a real configuration surface
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Failure persisting or loading the profile collection file
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SwitchError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Backend(err) => err.kind.code(),
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// What went wrong while touching a configuration surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// OS denied the write
    Permission,
    /// Read/write/delete failed
    Io,
    /// Document could not be serialized
    Encoding,
    /// The surface does not exist on this platform
    Unsupported,
}

impl BackendErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Permission => "PERMISSION_DENIED",
            Self::Io => "IO_ERROR",
            Self::Encoding => "ENCODING_ERROR",
            Self::Unsupported => "UNSUPPORTED_SURFACE",
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permission => write!(f, "permission"),
            Self::Io => write!(f, "I/O"),
            Self::Encoding => write!(f, "encoding"),
            Self::Unsupported => write!(f, "unsupported-surface"),
        }
    }
}

/// Failure writing or clearing a real configuration surface
///
/// `surface` names the environment store or file involved; messages never
/// carry credential values.
#[derive(Debug, Error)]
#[error("{kind} error on {surface}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub surface: String,
    pub message: String,
}

impl BackendError {
    /// Classify an I/O failure against `surface`
    #[must_use]
    pub fn io(surface: impl Into<String>, err: &std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::PermissionDenied {
            BackendErrorKind::Permission
        } else {
            BackendErrorKind::Io
        };
        Self {
            kind,
            surface: surface.into(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn encoding(surface: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Encoding,
            surface: surface.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported(surface: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Unsupported,
            surface: surface.into(),
            message: message.into(),
        }
    }
}

/// Failure persisting or loading the profile collection file
#[derive(Debug, Error)]
pub enum StorageError {
    /// Home directory not found
    #[error("Home directory not found")]
    NoHomeDir,

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The persisted collection could not be parsed
    #[error("JSON parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
