//! Detail view — rebuilds one stored resume (PDF, preview image, feedback) for
//! display.
//!
//! Each `load` starts a new generation. Handles created by a load belong to
//! that generation: they are handed to the view only if the load is still the
//! current one when it finishes, and are revoked all together when the next
//! load starts or the view is torn down. A superseded load revokes what it
//! created and discards its result.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::resume::{record_key, Feedback, StoredRecord};
use crate::payload::{normalize, NormalizedBinary, OpaquePayload};
use crate::stores::{DisplayHandle, FileStore, KvStore, ResourceRegistry};

const PDF_MEDIA_TYPE: &str = "application/pdf";
/// Tried in order for the preview image.
const IMAGE_MEDIA_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DetailSnapshot {
    pub resume_id: String,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub resume_url: DisplayHandle,
    pub image_url: Option<DisplayHandle>,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailState {
    Idle,
    Loading,
    Ready(DetailSnapshot),
    Failed { error: String },
}

/// Why a load did not produce a snapshot. `Display` is the user-facing text.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Resume not found in kv.")]
    NotFound,

    #[error("Failed to read resume file.")]
    UnreadableFile,

    #[error("Could not build PDF blob.")]
    UnrepresentablePayload,

    #[error("Failed to load resume.")]
    Decode(#[source] anyhow::Error),

    #[error("load superseded")]
    Superseded,
}

struct ViewInner {
    generation: u64,
    state: DetailState,
    owned: Vec<DisplayHandle>,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct DetailView {
    kv: Arc<dyn KvStore>,
    files: Arc<dyn FileStore>,
    registry: Arc<dyn ResourceRegistry>,
    inner: Mutex<ViewInner>,
}

impl DetailView {
    pub fn new(
        kv: Arc<dyn KvStore>,
        files: Arc<dyn FileStore>,
        registry: Arc<dyn ResourceRegistry>,
    ) -> Self {
        Self {
            kv,
            files,
            registry,
            inner: Mutex::new(ViewInner {
                generation: 0,
                state: DetailState::Idle,
                owned: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> DetailState {
        self.inner.lock().state.clone()
    }

    /// Handles currently owned by the view.
    #[cfg(test)]
    pub fn owned_handles(&self) -> Vec<DisplayHandle> {
        self.inner.lock().owned.clone()
    }

    /// Loads resume `id`, superseding any load still in flight.
    /// Returns the state this load produced, or the current state if it was
    /// superseded before finishing.
    pub async fn load(&self, id: &str) -> DetailState {
        let generation = self.begin_generation(DetailState::Loading);
        info!("Loading resume {id} (generation {generation})");

        let mut created = Vec::new();
        let outcome = self.fetch(id, generation, &mut created).await;

        match &outcome {
            Ok(_) => info!("Resume {id} loaded with {} handle(s)", created.len()),
            Err(LoadError::Superseded) => debug!("Load of {id} superseded"),
            Err(LoadError::Decode(e)) => warn!("Failed to load resume {id}: {e:#}"),
            Err(e) => warn!("Resume {id}: {e}"),
        }

        let state = match outcome {
            Ok(snapshot) => DetailState::Ready(snapshot),
            Err(e) => DetailState::Failed {
                error: e.to_string(),
            },
        };
        self.commit(generation, state, created)
    }

    /// Revokes every handle the view owns and returns it to `Idle`. Any load
    /// still in flight is superseded.
    pub fn teardown(&self) {
        self.begin_generation(DetailState::Idle);
    }

    /// Bumps the generation, sets `state`, and revokes the previous
    /// generation's handles outside the lock.
    fn begin_generation(&self, state: DetailState) -> u64 {
        let (generation, previous) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state = state;
            (inner.generation, std::mem::take(&mut inner.owned))
        };
        self.revoke_all(&previous);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), LoadError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(LoadError::Superseded)
        }
    }

    /// Applies a finished load if it is still current; otherwise revokes what
    /// it created.
    fn commit(
        &self,
        generation: u64,
        state: DetailState,
        created: Vec<DisplayHandle>,
    ) -> DetailState {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            let current = inner.state.clone();
            drop(inner);
            self.revoke_all(&created);
            return current;
        }
        inner.owned.extend(created);
        inner.state = state.clone();
        state
    }

    fn revoke_all(&self, handles: &[DisplayHandle]) {
        for handle in handles {
            if let Err(e) = self.registry.revoke(handle) {
                warn!("Failed to revoke {handle}: {e}");
            }
        }
    }

    async fn fetch(
        &self,
        id: &str,
        generation: u64,
        created: &mut Vec<DisplayHandle>,
    ) -> Result<DetailSnapshot, LoadError> {
        let raw = self
            .kv
            .get(&record_key(id))
            .await
            .map_err(LoadError::Decode)?
            .ok_or(LoadError::NotFound)?;
        self.ensure_current(generation)?;

        let record: StoredRecord =
            serde_json::from_str(&raw).map_err(|e| LoadError::Decode(e.into()))?;

        let image_read = async {
            if record.image_path.is_empty() {
                Ok(None)
            } else {
                self.files.read(&record.image_path).await
            }
        };
        let (pdf_payload, image_payload) =
            tokio::join!(self.files.read(&record.resume_path), image_read);
        self.ensure_current(generation)?;

        let pdf_payload = match pdf_payload {
            Ok(Some(payload)) => payload,
            Ok(None) => return Err(LoadError::UnreadableFile),
            Err(e) => {
                warn!("Reading {} failed: {e:#}", record.resume_path);
                return Err(LoadError::UnreadableFile);
            }
        };
        let pdf = normalize(Some(&pdf_payload), PDF_MEDIA_TYPE)
            .ok_or(LoadError::UnrepresentablePayload)?;
        let resume_url = self.registry.create(pdf).map_err(LoadError::Decode)?;
        created.push(resume_url);

        let image_url = match image_payload {
            Ok(payload) => self.create_preview(&record.image_path, payload.as_ref(), created),
            Err(e) => {
                warn!("Reading preview {} failed: {e:#}", record.image_path);
                None
            }
        };

        Ok(DetailSnapshot {
            resume_id: id.to_string(),
            company_name: record.company_name,
            job_title: record.job_title,
            resume_url,
            image_url,
            feedback: record.feedback,
        })
    }

    /// The preview is optional: any failure here is logged and skipped.
    fn create_preview(
        &self,
        path: &str,
        payload: Option<&OpaquePayload>,
        created: &mut Vec<DisplayHandle>,
    ) -> Option<DisplayHandle> {
        let payload = payload?;
        let image: Option<NormalizedBinary> = IMAGE_MEDIA_TYPES
            .iter()
            .find_map(|media_type| normalize(Some(payload), media_type));
        let Some(image) = image else {
            warn!("Preview {path} could not be normalized; skipping");
            return None;
        };
        match self.registry.create(image) {
            Ok(handle) => {
                created.push(handle);
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to register preview {path}: {e:#}");
                None
            }
        }
    }
}

impl Drop for DetailView {
    fn drop(&mut self) {
        let owned = std::mem::take(&mut self.inner.get_mut().owned);
        self.revoke_all(&owned);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
