use crate::{
    execution::{
        poller::PollPolicy,
        results::{FetchPolicy, MAX_PAGE_SIZE},
        ExecutionContext,
    },
    query::builder::validate_identifier,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env,
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub aws_region: String,
    pub athena_catalog: String,
    pub athena_database: String,
    pub athena_output_location: String,
    pub athena_workgroup: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub page_size: u32,
    pub max_rows: usize,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    lakehouse_listen_addr: Option<String>,
    #[serde(default)]
    lakehouse_listen_host: Option<String>,
    #[serde(default)]
    lakehouse_listen_port: Option<u16>,
    #[serde(default = "default_region")]
    aws_region: String,
    #[serde(default = "default_catalog")]
    athena_catalog: String,
    #[serde(default = "default_database")]
    athena_database: String,
    #[serde(default = "default_output_location")]
    athena_output_location: String,
    #[serde(default = "default_workgroup")]
    athena_workgroup: String,
    #[serde(default = "default_poll_interval_ms")]
    lakehouse_poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    lakehouse_max_poll_attempts: u32,
    #[serde(default = "default_page_size")]
    lakehouse_page_size: u32,
    #[serde(default = "default_max_rows")]
    lakehouse_max_rows: usize,
    #[serde(default = "default_timeout_secs")]
    lakehouse_request_timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_catalog() -> String {
    "AwsDataCatalog".to_string()
}

fn default_database() -> String {
    "micondominio_lakehouse_db".to_string()
}

fn default_output_location() -> String {
    "s3://g2-mi-condominio-athenas/temp-sql/".to_string()
}

fn default_workgroup() -> String {
    "primary".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    2000
}

const fn default_max_poll_attempts() -> u32 {
    150
}

const fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

const fn default_max_rows() -> usize {
    10_000
}

const fn default_timeout_secs() -> u64 {
    330
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawConfig = envy::from_iter(vars)
            .context("failed to parse LAKEHOUSE_*/ATHENA_* environment variables")?;

        let listen_addr = resolve_addr(
            raw.lakehouse_listen_addr,
            raw.lakehouse_listen_host,
            raw.lakehouse_listen_port,
        )?;

        validate_identifier(&raw.athena_database)
            .map_err(|err| anyhow::anyhow!("invalid ATHENA_DATABASE: {err}"))?;

        Ok(Self {
            listen_addr,
            aws_region: raw.aws_region,
            athena_catalog: raw.athena_catalog,
            athena_database: raw.athena_database,
            athena_output_location: raw.athena_output_location,
            athena_workgroup: raw.athena_workgroup,
            poll_interval: Duration::from_millis(raw.lakehouse_poll_interval_ms.max(1)),
            max_poll_attempts: raw.lakehouse_max_poll_attempts.max(1),
            page_size: raw.lakehouse_page_size.clamp(1, MAX_PAGE_SIZE),
            max_rows: raw.lakehouse_max_rows.max(1),
            request_timeout: Duration::from_secs(raw.lakehouse_request_timeout_secs.max(1)),
        })
    }

    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext {
            catalog: self.athena_catalog.clone(),
            database: self.athena_database.clone(),
            output_location: self.athena_output_location.clone(),
            workgroup: self.athena_workgroup.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
        }
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            page_size: self.page_size,
            max_rows: self.max_rows,
        }
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid LAKEHOUSE_LISTEN_ADDR value")?
            .next()
            .context("LAKEHOUSE_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    let combined = format!("{}:{}", host, port);
    combined
        .to_socket_addrs()
        .context("invalid listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
