//! Shared application state for the dispatch handler.

use std::sync::Arc;

use tower_http::services::ServeDir;

use hpapower_app::ports::ActuatorDriver;
use hpapower_app::services::actuator_store::ActuatorStore;
use hpapower_app::services::transaction::ControlEndpoint;

/// Application state shared across all requests.
///
/// `Clone` is implemented manually so the driver type does not need to be
/// `Clone`; only the shared handles are cloned.
pub struct AppState<D> {
    /// The single actuator store.
    pub store: ActuatorStore<D>,
    /// Where the control endpoint lives and its field budget.
    pub endpoint: Arc<ControlEndpoint>,
    /// Static files for every other path.
    pub static_files: ServeDir,
}

impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            endpoint: Arc::clone(&self.endpoint),
            static_files: self.static_files.clone(),
        }
    }
}

impl<D> AppState<D>
where
    D: ActuatorDriver + 'static,
{
    /// Create a new application state.
    ///
    /// Directory requests on the static mount resolve to `index.html`.
    pub fn new(
        store: ActuatorStore<D>,
        endpoint: ControlEndpoint,
        static_root: impl AsRef<std::path::Path>,
    ) -> Self {
        Self {
            store,
            endpoint: Arc::new(endpoint),
            static_files: ServeDir::new(static_root).append_index_html_on_directories(true),
        }
    }
}
