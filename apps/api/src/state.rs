use std::sync::Arc;
use std::time::Duration;

use crate::stores::{AuthProvider, FileStore, KvStore, ResourceRegistry};
use crate::views::sessions::ViewSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    /// Backs every display handle the views create; served at `/api/v1/blobs/:handle`.
    pub registry: Arc<dyn ResourceRegistry>,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: Arc<ViewSessions>,
}

impl AppState {
    pub fn new(
        kv: Arc<dyn KvStore>,
        files: Arc<dyn FileStore>,
        registry: Arc<dyn ResourceRegistry>,
        auth: Arc<dyn AuthProvider>,
        view_idle_timeout: Duration,
    ) -> Self {
        let sessions = Arc::new(ViewSessions::new(
            kv.clone(),
            files,
            registry.clone(),
            view_idle_timeout,
        ));
        Self {
            kv,
            registry,
            auth,
            sessions,
        }
    }
}
