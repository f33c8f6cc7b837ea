use crate::{config::AppConfig, execution::QueryService, query::QueryEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub query: QueryEngine,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, service: Arc<dyn QueryService>) -> Self {
        let query = QueryEngine::new(service, Arc::clone(&config));
        Self { config, query }
    }
}
