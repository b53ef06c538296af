//! Activation orchestration
//!
//! The engine is the only component that flips `active` flags. Every
//! surface-touching operation for a family runs under that family's gate, and
//! the store is committed only after the backend succeeded, so a failure at
//! any step leaves both the persisted collection and the real surfaces as
//! they were. Operations on different families proceed concurrently; their
//! surfaces are disjoint.

use crate::backend::{ActivationBackend, EnvBackend, JsonFileBackend, UserEnvStore};
use crate::error::{SwitchError, SwitchResult};
use crate::merge::MergeWriter;
use crate::paths;
use crate::profile::store::{normalize_endpoint, validate_name};
use crate::profile::{ProfileRecord, ProfileStore, ToolFamily};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Caller-supplied choice of at most one profile per family for the merged
/// router document; `None` omits the family's section
pub type MergeSelection = BTreeMap<ToolFamily, Option<Uuid>>;

struct FamilySlot {
    gate: Mutex<()>,
    backend: Box<dyn ActivationBackend>,
}

/// Orchestrates profile CRUD, activation, and merged-config generation
pub struct ActivationEngine {
    store: Mutex<ProfileStore>,
    // Indexed by family discriminant; the constructor guarantees one slot per
    // family in `ToolFamily::ALL` order.
    slots: Vec<FamilySlot>,
    merge: MergeWriter,
}

impl ActivationEngine {
    /// Build an engine from an opened store and exactly one backend per family
    pub fn new(
        store: ProfileStore,
        backends: Vec<Box<dyn ActivationBackend>>,
        merge: MergeWriter,
    ) -> SwitchResult<Self> {
        let mut by_family: [Option<Box<dyn ActivationBackend>>; 3] = [None, None, None];
        for backend in backends {
            let family = backend.family();
            let slot = &mut by_family[family as usize];
            if slot.is_some() {
                return Err(SwitchError::Validation(format!(
                    "duplicate backend for family '{family}'"
                )));
            }
            *slot = Some(backend);
        }

        let mut slots = Vec::with_capacity(ToolFamily::ALL.len());
        for (family, backend) in ToolFamily::ALL.into_iter().zip(by_family) {
            let backend = backend.ok_or_else(|| {
                SwitchError::Validation(format!("missing backend for family '{family}'"))
            })?;
            slots.push(FamilySlot {
                gate: Mutex::new(()),
                backend,
            });
        }

        Ok(Self {
            store: Mutex::new(store),
            slots,
            merge,
        })
    }

    /// Engine wired to the real per-user surfaces
    pub fn with_user_surfaces() -> SwitchResult<Self> {
        let store = ProfileStore::open(paths::profiles_path()?)?;
        let backends: Vec<Box<dyn ActivationBackend>> = vec![
            Box::new(EnvBackend::new(Arc::new(UserEnvStore))),
            Box::new(JsonFileBackend::new(
                ToolFamily::Codex,
                paths::codex_auth_path()?,
            )),
            Box::new(JsonFileBackend::new(
                ToolFamily::Gemini,
                paths::gemini_credentials_path()?,
            )),
        ];
        Self::new(store, backends, MergeWriter::new(paths::router_config_path()?))
    }

    /// Current snapshot, insertion order
    #[must_use]
    pub fn list_profiles(&self) -> Vec<ProfileRecord> {
        self.lock_store().list()
    }

    /// Create a new inactive profile and persist it
    pub fn add_profile(
        &self,
        name: &str,
        family: ToolFamily,
        secret: String,
        endpoint: Option<String>,
    ) -> SwitchResult<ProfileRecord> {
        let record = self.lock_store().add(name, family, secret, endpoint)?;
        info!(id = %record.id, family = %record.family, "added profile");
        Ok(record)
    }

    /// Replace a profile's name, secret, and endpoint
    ///
    /// When the profile is the family's active one, its surface is re-applied
    /// with the new values before the store commits; a backend failure leaves
    /// both the surface and the stored record unchanged.
    pub fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        secret: String,
        endpoint: Option<String>,
    ) -> SwitchResult<ProfileRecord> {
        let name = validate_name(name)?;
        let endpoint = normalize_endpoint(endpoint);

        let family = self.family_of(id)?;
        let slot = self.slot(family);
        let _gate = lock_gate(&slot.gate);

        let preview = {
            let store = self.lock_store();
            let current = store.get(id).ok_or(SwitchError::NotFound(id))?;
            ProfileRecord {
                name: name.clone(),
                secret: secret.clone(),
                endpoint: endpoint.clone(),
                ..current.clone()
            }
        };

        if preview.active {
            slot.backend.apply(&preview)?;
            debug!(id = %id, family = %family, "re-applied active profile after update");
        }

        let updated = self.lock_store().update(id, &name, secret, endpoint)?;
        info!(id = %id, family = %family, "updated profile");
        Ok(updated)
    }

    /// Delete a profile
    ///
    /// An active profile's surface is cleared first; when the clear fails the
    /// record stays in the store and the error is surfaced.
    pub fn delete_profile(&self, id: Uuid) -> SwitchResult<()> {
        let family = self.family_of(id)?;
        let slot = self.slot(family);
        let _gate = lock_gate(&slot.gate);

        let was_active = {
            let store = self.lock_store();
            store.get(id).ok_or(SwitchError::NotFound(id))?.active
        };

        if was_active {
            slot.backend.clear()?;
        }

        self.lock_store().remove(id)?;
        info!(id = %id, family = %family, was_active, "deleted profile");
        Ok(())
    }

    /// Make `id` the live profile for its family
    ///
    /// The previously active profile's surface comes off before the new one
    /// goes on; flag flips and the persist happen only once the backend has
    /// fully applied, so any failure leaves the stored flags bit-identical to
    /// the pre-call state.
    pub fn activate_profile(&self, id: Uuid) -> SwitchResult<ProfileRecord> {
        let family = self.family_of(id)?;
        let slot = self.slot(family);
        let _gate = lock_gate(&slot.gate);

        let (target, previous) = {
            let store = self.lock_store();
            let target = store.get(id).ok_or(SwitchError::NotFound(id))?.clone();
            let previous = store
                .active_of(family)
                .map(|r| r.id)
                .filter(|prev| *prev != id);
            (target, previous)
        };

        if let Some(prev_id) = previous {
            // Fail closed: the old surface must come off cleanly before the
            // new one goes on.
            slot.backend.clear()?;
            debug!(id = %prev_id, family = %family, "cleared previously active profile");
        }

        slot.backend.apply(&target)?;

        let activated = {
            let mut store = self.lock_store();
            if let Some(prev_id) = previous {
                store.set_active(prev_id, false)?;
            }
            store.set_active(id, true)?;
            if let Err(err) = store.persist() {
                // Keep the in-memory flags consistent with disk.
                if let Some(prev_id) = previous {
                    let _ = store.set_active(prev_id, true);
                }
                let _ = store.set_active(id, target.active);
                return Err(err.into());
            }
            store.get(id).ok_or(SwitchError::NotFound(id))?.clone()
        };

        info!(id = %id, family = %family, "activated profile");
        Ok(activated)
    }

    /// Clear `family`'s surface and drop its active flag, if any
    ///
    /// A no-op success when the family has no active profile.
    pub fn deactivate_current(&self, family: ToolFamily) -> SwitchResult<()> {
        let slot = self.slot(family);
        let _gate = lock_gate(&slot.gate);

        let active_id = self.lock_store().active_of(family).map(|r| r.id);
        let Some(id) = active_id else {
            return Ok(());
        };

        slot.backend.clear()?;

        {
            let mut store = self.lock_store();
            store.set_active(id, false)?;
            if let Err(err) = store.persist() {
                let _ = store.set_active(id, true);
                return Err(err.into());
            }
        }

        info!(id = %id, family = %family, "deactivated profile");
        Ok(())
    }

    /// Regenerate the merged router document from an explicit selection
    ///
    /// Independent of activation state; never mutates the store.
    pub fn apply_merged_config(&self, selection: &MergeSelection) -> SwitchResult<()> {
        let mut sections = Vec::new();
        {
            let store = self.lock_store();
            for (family, choice) in selection {
                let Some(id) = choice else { continue };
                let record = store.get(*id).ok_or(SwitchError::NotFound(*id))?.clone();
                if record.family != *family {
                    return Err(SwitchError::Validation(format!(
                        "profile {id} belongs to family '{}', not '{family}'",
                        record.family
                    )));
                }
                sections.push(record);
            }
        }

        self.merge.write(&sections)?;
        let families: Vec<ToolFamily> = sections.iter().map(|r| r.family).collect();
        info!(?families, "wrote merged router config");
        Ok(())
    }

    fn family_of(&self, id: Uuid) -> SwitchResult<ToolFamily> {
        self.lock_store()
            .get(id)
            .map(|r| r.family)
            .ok_or(SwitchError::NotFound(id))
    }

    fn slot(&self, family: ToolFamily) -> &FamilySlot {
        &self.slots[family as usize]
    }

    fn lock_store(&self) -> MutexGuard<'_, ProfileStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_gate(gate: &Mutex<()>) -> MutexGuard<'_, ()> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}
