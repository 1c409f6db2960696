use std::sync::Arc;

use crate::config::Config;
use crate::extraction::Extractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Moved into blocking tasks, hence the `Arc`.
    pub extractor: Arc<Extractor>,
}

impl AppState {
    pub fn new(config: Config, extractor: Extractor) -> Self {
        Self {
            config,
            extractor: Arc::new(extractor),
        }
    }
}
