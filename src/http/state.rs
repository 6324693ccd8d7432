use crate::podcast::PodcastController;
use crate::report::{ReportContext, ReportKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds a controller for a report; each call yields an independent session
pub type ControllerFactory = Arc<dyn Fn(ReportContext) -> PodcastController + Send + Sync>;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active podcast sessions (report kind → controller)
    pub sessions: Arc<RwLock<HashMap<ReportKind, Arc<PodcastController>>>>,

    factory: ControllerFactory,
}

impl AppState {
    /// Create state with one latest-report session per kind
    pub fn new(factory: ControllerFactory) -> Self {
        let sessions = ReportKind::ALL
            .iter()
            .map(|&kind| (kind, Arc::new(factory(ReportContext::new(kind, None)))))
            .collect();

        Self {
            sessions: Arc::new(RwLock::new(sessions)),
            factory,
        }
    }

    pub async fn session(&self, kind: ReportKind) -> Option<Arc<PodcastController>> {
        self.sessions.read().await.get(&kind).cloned()
    }

    /// Replace the session for `report.kind` with a fresh one
    ///
    /// The previous session is torn down, releasing its audio.
    pub async fn open_session(&self, report: ReportContext) -> Arc<PodcastController> {
        let controller = Arc::new((self.factory)(report));

        let previous = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(report.kind, Arc::clone(&controller))
        };

        if let Some(previous) = previous {
            previous.teardown();
        }

        controller
    }
}
