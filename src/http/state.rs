use crate::analysis::ResultStore;
use crate::session::SessionController;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The mounted capture session
    pub controller: Arc<SessionController>,

    /// Handoff slot read by the results view
    pub store: ResultStore,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>, store: ResultStore) -> Self {
        Self { controller, store }
    }
}
