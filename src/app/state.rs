//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::game::MatchRegistry;
use crate::messaging::ConnectionHub;
use crate::store::MatchStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<ConnectionHub>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MatchStore>) -> Result<Self, ConfigError> {
        let settings = config.game_settings()?;
        let config = Arc::new(config);

        // Connected sockets and their topic listeners
        let hub = Arc::new(ConnectionHub::new());

        // Matches talk to participants through the hub
        let match_registry = Arc::new(MatchRegistry::new(settings, hub.clone(), store));

        Ok(Self {
            config,
            hub,
            match_registry,
        })
    }
}
