pub mod athena;
pub mod config;
pub mod error;
pub mod execution;
pub mod query;
pub mod response;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod time;

use crate::{athena::AthenaService, config::AppConfig, error::ServiceError, server::Server};
use std::sync::Arc;

/// Bootstraps the lakehouse API against Athena using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config =
        AppConfig::from_env().map_err(|err| ServiceError::Config(format!("{err:#}")))?;
    let service = AthenaService::from_config(&config).await;
    Server::new(config, Arc::new(service)).run().await
}
