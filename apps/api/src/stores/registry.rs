use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::debug;

use super::{DisplayHandle, ResourceRegistry};
use crate::payload::NormalizedBinary;

/// In-process resource registry. Content lives in memory until its handle is
/// revoked; the HTTP layer serves live handles at `DisplayHandle::url`.
#[derive(Default)]
pub struct HandleRegistry {
    entries: Mutex<HashMap<DisplayHandle, NormalizedBinary>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles created and not yet revoked.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl ResourceRegistry for HandleRegistry {
    fn create(&self, binary: NormalizedBinary) -> Result<DisplayHandle> {
        let handle = DisplayHandle::new();
        debug!(
            "Created {handle} ({}, {} bytes)",
            binary.media_type,
            binary.data.len()
        );
        self.entries.lock().insert(handle, binary);
        Ok(handle)
    }

    fn revoke(&self, handle: &DisplayHandle) -> Result<()> {
        if self.entries.lock().remove(handle).is_some() {
            debug!("Revoked {handle}");
        }
        Ok(())
    }

    fn resolve(&self, handle: &DisplayHandle) -> Option<NormalizedBinary> {
        self.entries.lock().get(handle).cloned()
    }
}
