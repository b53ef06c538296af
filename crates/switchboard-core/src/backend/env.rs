//! Environment-store backend for the Claude family
//!
//! Claude Code reads its credentials from two entries in the current user's
//! persistent environment store. The store itself is injected as a handle so
//! the engine can run against an in-memory double; the real handle talks to
//! `HKCU\Environment` on Windows and reports the surface as unsupported
//! elsewhere.

use super::ActivationBackend;
use crate::error::BackendError;
use crate::profile::{ProfileRecord, ToolFamily};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const SURFACE: &str = "user environment store";

/// Handle to a persistent per-user environment variable store
pub trait EnvStore: Send + Sync {
    /// Current value of `key`, if present
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Removing an absent entry is a no-op success
    fn remove(&self, key: &str) -> Result<(), BackendError>;

    /// Announce that the environment changed
    ///
    /// Freshly started processes observe the new values; already-running
    /// processes keep their snapshot until restarted.
    fn broadcast_change(&self) -> Result<(), BackendError>;
}

/// Activation backend writing the Claude auth-token and base-URL entries
pub struct EnvBackend {
    store: Arc<dyn EnvStore>,
}

impl EnvBackend {
    #[must_use]
    pub fn new(store: Arc<dyn EnvStore>) -> Self {
        Self { store }
    }
}

impl ActivationBackend for EnvBackend {
    fn family(&self) -> ToolFamily {
        ToolFamily::Claude
    }

    fn apply(&self, record: &ProfileRecord) -> Result<(), BackendError> {
        let keys = self.family().keys();

        // Snapshot for rollback before the first write lands.
        let previous_token = self.store.get(keys.secret_key)?;
        self.store.set(keys.secret_key, &record.secret)?;

        let endpoint_result = match &record.endpoint {
            Some(url) => self.store.set(keys.endpoint_key, url),
            None => self.store.remove(keys.endpoint_key),
        };
        if let Err(err) = endpoint_result {
            // Put the token entry back so the surface is never half-applied.
            match previous_token {
                Some(old) => {
                    let _ = self.store.set(keys.secret_key, &old);
                }
                None => {
                    let _ = self.store.remove(keys.secret_key);
                }
            }
            return Err(err);
        }

        // One broadcast per successful apply.
        self.store.broadcast_change()
    }

    fn clear(&self) -> Result<(), BackendError> {
        let keys = self.family().keys();
        self.store.remove(keys.secret_key)?;
        self.store.remove(keys.endpoint_key)
    }
}

/// The real per-user persistent store
///
/// On Windows this is the `Environment` key under `HKEY_CURRENT_USER`; other
/// platforms have no persistent per-user store to write, so every call fails
/// with an unsupported-surface error.
pub struct UserEnvStore;

#[cfg(target_os = "windows")]
impl EnvStore for UserEnvStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        use winreg::enums::{HKEY_CURRENT_USER, KEY_QUERY_VALUE};
        use winreg::RegKey;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let env = hkcu
            .open_subkey_with_flags("Environment", KEY_QUERY_VALUE)
            .map_err(|e| BackendError::io(SURFACE, &e))?;
        match env.get_value::<String, _>(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::io(SURFACE, &e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};
        use winreg::RegKey;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let env = hkcu
            .open_subkey_with_flags("Environment", KEY_SET_VALUE)
            .map_err(|e| BackendError::io(SURFACE, &e))?;
        env.set_value(key, &value)
            .map_err(|e| BackendError::io(SURFACE, &e))
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};
        use winreg::RegKey;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let env = hkcu
            .open_subkey_with_flags("Environment", KEY_SET_VALUE)
            .map_err(|e| BackendError::io(SURFACE, &e))?;
        match env.delete_value(key) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::io(SURFACE, &e)),
        }
    }

    fn broadcast_change(&self) -> Result<(), BackendError> {
        // Registry writes reach every process started from here on; running
        // terminals keep their environment snapshot until restarted.
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl EnvStore for UserEnvStore {
    fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Err(unsupported())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), BackendError> {
        Err(unsupported())
    }

    fn remove(&self, _key: &str) -> Result<(), BackendError> {
        Err(unsupported())
    }

    fn broadcast_change(&self) -> Result<(), BackendError> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "windows"))]
fn unsupported() -> BackendError {
    BackendError::unsupported(
        SURFACE,
        "persistent environment variables are only supported on Windows",
    )
}

/// In-memory environment store with a broadcast counter
///
/// Used by the test suites and by embedders that want activation without
/// touching OS state.
#[derive(Default)]
pub struct MemoryEnvStore {
    vars: Mutex<HashMap<String, String>>,
    broadcasts: AtomicUsize,
}

impl MemoryEnvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// How many change broadcasts have been issued
    #[must_use]
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

impl EnvStore for MemoryEnvStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn broadcast_change(&self) -> Result<(), BackendError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendErrorKind;
    use std::sync::atomic::AtomicBool;

    /// Store whose endpoint-entry writes fail on demand
    #[derive(Default)]
    struct FlakyEnvStore {
        inner: MemoryEnvStore,
        fail_endpoint_writes: AtomicBool,
    }

    impl FlakyEnvStore {
        fn endpoint_key() -> &'static str {
            ToolFamily::Claude.keys().endpoint_key
        }
    }

    impl EnvStore for FlakyEnvStore {
        fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
            if key == Self::endpoint_key() && self.fail_endpoint_writes.load(Ordering::SeqCst) {
                return Err(BackendError {
                    kind: BackendErrorKind::Permission,
                    surface: SURFACE.to_string(),
                    message: "denied".to_string(),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), BackendError> {
            if key == Self::endpoint_key() && self.fail_endpoint_writes.load(Ordering::SeqCst) {
                return Err(BackendError {
                    kind: BackendErrorKind::Permission,
                    surface: SURFACE.to_string(),
                    message: "denied".to_string(),
                });
            }
            self.inner.remove(key)
        }

        fn broadcast_change(&self) -> Result<(), BackendError> {
            self.inner.broadcast_change()
        }
    }

    fn record(secret: &str, endpoint: Option<&str>) -> ProfileRecord {
        ProfileRecord::new(
            "test".to_string(),
            ToolFamily::Claude,
            secret.to_string(),
            endpoint.map(String::from),
        )
    }

    #[test]
    fn test_apply_sets_both_entries_and_broadcasts_once() {
        let store = Arc::new(MemoryEnvStore::new());
        let backend = EnvBackend::new(store.clone());
        let keys = ToolFamily::Claude.keys();

        backend
            .apply(&record("sk-token", Some("https://proxy.example")))
            .unwrap();

        assert_eq!(store.value(keys.secret_key).as_deref(), Some("sk-token"));
        assert_eq!(
            store.value(keys.endpoint_key).as_deref(),
            Some("https://proxy.example")
        );
        assert_eq!(store.broadcast_count(), 1);
    }

    #[test]
    fn test_apply_without_endpoint_removes_base_url() {
        let store = Arc::new(MemoryEnvStore::new());
        let backend = EnvBackend::new(store.clone());
        let keys = ToolFamily::Claude.keys();
        store.set(keys.endpoint_key, "https://stale.example").unwrap();

        backend.apply(&record("sk-token", None)).unwrap();

        assert_eq!(store.value(keys.endpoint_key), None);
    }

    #[test]
    fn test_failed_endpoint_write_rolls_back_token() {
        let store = Arc::new(FlakyEnvStore::default());
        let keys = ToolFamily::Claude.keys();
        store.inner.set(keys.secret_key, "sk-old").unwrap();
        let backend = EnvBackend::new(store.clone());

        store.fail_endpoint_writes.store(true, Ordering::SeqCst);
        let err = backend
            .apply(&record("sk-new", Some("https://proxy.example")))
            .unwrap_err();

        assert_eq!(err.kind, BackendErrorKind::Permission);
        assert_eq!(store.inner.value(keys.secret_key).as_deref(), Some("sk-old"));
        assert_eq!(store.inner.broadcast_count(), 0);
    }

    #[test]
    fn test_failed_endpoint_write_rolls_back_absent_token() {
        let store = Arc::new(FlakyEnvStore::default());
        let keys = ToolFamily::Claude.keys();
        let backend = EnvBackend::new(store.clone());

        store.fail_endpoint_writes.store(true, Ordering::SeqCst);
        backend
            .apply(&record("sk-new", Some("https://proxy.example")))
            .unwrap_err();

        assert_eq!(store.inner.value(keys.secret_key), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = Arc::new(MemoryEnvStore::new());
        let backend = EnvBackend::new(store.clone());

        backend.apply(&record("sk-token", None)).unwrap();
        backend.clear().unwrap();
        backend.clear().unwrap();

        let keys = ToolFamily::Claude.keys();
        assert_eq!(store.value(keys.secret_key), None);
        assert_eq!(store.value(keys.endpoint_key), None);
    }
}
