use std::sync::Arc;

use phishwatch_core::resolver::Resolver;
use tokio::sync::Semaphore;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// Bounds resolutions in flight across all requests.
    pub permits: Arc<Semaphore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, resolver: Resolver) -> Self {
        AppState {
            resolver: Arc::new(resolver),
            permits: Arc::new(Semaphore::new(config.max_concurrent_resolves)),
            config: Arc::new(config),
        }
    }
}
