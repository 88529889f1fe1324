use config::Config;
use sse::Hub;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, hub: &Arc<Hub>) -> Self {
        Self {
            hub: Arc::clone(hub),
            config: app_config,
        }
    }

    /// Builds the broadcast hub described by `app_config` and wraps it in a new state.
    pub fn from_config(app_config: Config) -> Self {
        let hub = Arc::new(Hub::new(app_config.hub_config()));
        Self::new(app_config, &hub)
    }

    pub fn hub_ref(&self) -> &Hub {
        self.hub.as_ref()
    }
}
