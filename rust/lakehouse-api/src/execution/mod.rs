//! Asynchronous query execution: the remote capability and the pipeline stages
//! built on top of it (submit, poll to completion, fetch and materialize).

pub mod poller;
pub mod results;
pub mod submitter;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Where and how a query runs on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub catalog: String,
    pub database: String,
    pub output_location: String,
    pub workgroup: String,
}

/// Opaque identifier handed out by the remote service on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported by the service for one execution. Every field is
/// optional because the service only fills them in as the query progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStatistics {
    pub total_execution_time_millis: Option<i64>,
    pub engine_execution_time_millis: Option<i64>,
    pub queue_time_millis: Option<i64>,
    pub data_scanned_bytes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    pub reason: Option<String>,
    pub statistics: Option<ExecutionStatistics>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            reason: None,
            statistics: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_statistics(mut self, statistics: ExecutionStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

/// A single cell as it arrives on the wire: absent or the textual form of a scalar.
pub type RawCell = Option<String>;
pub type RawRow = Vec<RawCell>;

/// One page of a result set. Only the first page carries the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub columns: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
    pub next_page_token: Option<String>,
}

/// The remote asynchronous SQL service.
///
/// Implementations only translate calls; retry, polling and pagination
/// policy live in the pipeline stages.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn submit(
        &self,
        query: &str,
        context: &ExecutionContext,
    ) -> anyhow::Result<ExecutionHandle>;

    async fn status(&self, handle: &ExecutionHandle) -> anyhow::Result<ExecutionStatus>;

    async fn results(
        &self,
        handle: &ExecutionHandle,
        page_token: Option<&str>,
        max_results: u32,
    ) -> anyhow::Result<ResultPage>;

    async fn cancel(&self, handle: &ExecutionHandle) -> anyhow::Result<()>;
}
