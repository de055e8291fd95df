use safecity_notify::HandlerRegistry;
use std::sync::Arc;

/// Shared by every request; handlers keep no per-request state.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: Arc<HandlerRegistry>,
}

impl AppState {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<HandlerRegistry> {
        Arc::clone(&self.registry)
    }
}
