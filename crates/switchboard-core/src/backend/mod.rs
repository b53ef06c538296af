//! Activation backends
//!
//! One backend per tool family; each knows how to project a profile onto its
//! family's real configuration surface and how to blank that surface again.

mod env;
mod file;

pub use env::{EnvBackend, EnvStore, MemoryEnvStore, UserEnvStore};
pub use file::JsonFileBackend;

use crate::error::BackendError;
use crate::profile::{ProfileRecord, ToolFamily};

/// Capability set shared by every family's activation mechanism
///
/// `apply` is all-or-nothing: a failure partway through may not leave a
/// half-written surface behind. `clear` is idempotent; blanking an
/// already-blank surface succeeds.
pub trait ActivationBackend: Send + Sync {
    /// The family this backend writes for
    fn family(&self) -> ToolFamily;

    /// Push the record's secret/endpoint onto the surface
    fn apply(&self, record: &ProfileRecord) -> Result<(), BackendError>;

    /// Remove the family's entries from the surface
    fn clear(&self) -> Result<(), BackendError>;
}
