//! Camera device selection
//!
//! Picks which video input to open: an explicit request, else the device
//! remembered from the last session, else one whose label or facing says it
//! points away from the operator, else the first one listed.

use crate::scanner::types::{DeviceInfo, Facing};
use crate::store::api::KeyValueStore;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static REAR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:back|rear|environment|trasera|posterior)\b")
        .expect("rear label pattern is valid")
});

const DEVICE_KEY: &str = "camera_device_id";

/// True when a device label names a rear-facing camera
pub fn looks_rear_facing(label: &str) -> bool {
    REAR_LABEL.is_match(label)
}

/// Chooses and remembers the camera device
#[derive(Clone, Default)]
pub struct DeviceSelector {
    store: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSelector")
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl DeviceSelector {
    pub fn new(store: Option<Arc<dyn KeyValueStore>>) -> Self {
        Self { store }
    }

    /// Device id remembered from a previous session
    ///
    /// Store failures are logged and treated as "nothing remembered"; a
    /// broken preference file must not keep the camera from starting.
    pub fn stored(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(DEVICE_KEY) {
            Ok(value) => value.filter(|id| !id.is_empty()),
            Err(e) => {
                log::warn!("Could not read stored camera preference: {}", e);
                None
            }
        }
    }

    /// Remember `device_id` for the next session
    pub fn remember(&self, device_id: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.set(DEVICE_KEY, device_id) {
                log::warn!("Could not store camera preference: {}", e);
            }
        }
    }

    /// Forget the remembered device
    pub fn forget(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(DEVICE_KEY) {
                log::warn!("Could not clear camera preference: {}", e);
            }
        }
    }

    /// Device id to open, or `None` to let the provider pick by facing
    ///
    /// An explicit id is used even when it is not listed: some platforms
    /// only label devices after permission has been granted.
    pub fn choose(
        &self,
        devices: &[DeviceInfo],
        explicit: Option<&str>,
        preferred: Facing,
    ) -> Option<String> {
        if let Some(id) = explicit {
            return Some(id.to_string());
        }

        if let Some(stored) = self.stored() {
            if devices.iter().any(|d| d.id == stored) {
                return Some(stored);
            }
            log::debug!("Stored camera '{}' is no longer available", stored);
        }

        let preferred_device = devices.iter().find(|d| {
            d.facing == preferred || (preferred == Facing::Rear && looks_rear_facing(&d.label))
        });

        preferred_device
            .or_else(|| devices.first())
            .map(|d| d.id.clone())
    }
}
