use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::stores::{FileStore, KvStore, ResourceRegistry};
use crate::views::detail::DetailView;

struct OpenView {
    view: Arc<DetailView>,
    last_touched: Instant,
}

/// Open detail views keyed by view id. A client opens a view, loads resumes
/// into it, and closes it to release the view's handles. Views nobody has
/// touched for `idle_timeout` are torn down by `evict_idle`.
pub struct ViewSessions {
    kv: Arc<dyn KvStore>,
    files: Arc<dyn FileStore>,
    registry: Arc<dyn ResourceRegistry>,
    idle_timeout: Duration,
    views: Mutex<HashMap<Uuid, OpenView>>,
}

impl ViewSessions {
    pub fn new(
        kv: Arc<dyn KvStore>,
        files: Arc<dyn FileStore>,
        registry: Arc<dyn ResourceRegistry>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            kv,
            files,
            registry,
            idle_timeout,
            views: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        let view = Arc::new(DetailView::new(
            self.kv.clone(),
            self.files.clone(),
            self.registry.clone(),
        ));
        self.views.lock().insert(
            id,
            OpenView {
                view,
                last_touched: Instant::now(),
            },
        );
        info!("Opened view {id}");
        id
    }

    /// Looks up an open view and marks it as recently used.
    pub fn get(&self, id: &Uuid) -> Option<Arc<DetailView>> {
        let mut views = self.views.lock();
        let open = views.get_mut(id)?;
        open.last_touched = Instant::now();
        Some(open.view.clone())
    }

    /// Tears the view down. Returns false if no such view is open.
    pub fn close(&self, id: &Uuid) -> bool {
        let Some(open) = self.views.lock().remove(id) else {
            return false;
        };
        open.view.teardown();
        info!("Closed view {id}");
        true
    }

    pub fn open_count(&self) -> usize {
        self.views.lock().len()
    }

    /// Tears down every view idle for at least `idle_timeout`. Returns how
    /// many were evicted.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let evicted: Vec<(Uuid, Arc<DetailView>)> = {
            let mut views = self.views.lock();
            let idle: Vec<Uuid> = views
                .iter()
                .filter(|(_, open)| now.duration_since(open.last_touched) >= self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            idle.into_iter()
                .filter_map(|id| views.remove(&id).map(|open| (id, open.view)))
                .collect()
        };
        for (id, view) in &evicted {
            view.teardown();
            info!("Evicted idle view {id}");
        }
        evicted.len()
    }

    /// Runs `evict_idle` every `period` until the sessions are dropped.
    pub fn spawn_idle_sweep(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let sessions: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(sessions) = sessions.upgrade() else {
                    break;
                };
                let evicted = sessions.evict_idle();
                if evicted > 0 {
                    debug!(
                        "Idle sweep evicted {evicted} view(s); {} open",
                        sessions.open_count()
                    );
                }
            }
        })
    }
}
