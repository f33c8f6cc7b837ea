//! Amazon Athena implementation of [`QueryService`].

use crate::{
    config::AppConfig,
    execution::{
        ExecutionContext, ExecutionHandle, ExecutionState, ExecutionStatistics, ExecutionStatus,
        QueryService, ResultPage,
    },
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::{
    config::Region,
    error::DisplayErrorContext,
    types::{
        QueryExecutionContext, QueryExecutionState, QueryExecutionStatistics, ResultConfiguration,
    },
    Client,
};
use tracing::info;

#[derive(Clone)]
pub struct AthenaService {
    client: Client,
}

impl AthenaService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default credential chain for the configured region.
    pub async fn from_config(config: &AppConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .load()
            .await;
        info!(region = %config.aws_region, "athena client configured");
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl QueryService for AthenaService {
    async fn submit(&self, query: &str, context: &ExecutionContext) -> Result<ExecutionHandle> {
        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .catalog(&context.catalog)
                    .database(&context.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&context.output_location)
                    .build(),
            )
            .work_group(&context.workgroup)
            .send()
            .await
            .map_err(|err| anyhow!("StartQueryExecution: {}", DisplayErrorContext(&err)))?;

        output
            .query_execution_id()
            .map(ExecutionHandle::new)
            .context("StartQueryExecution returned no execution id")
    }

    async fn status(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|err| anyhow!("GetQueryExecution: {}", DisplayErrorContext(&err)))?;

        let execution = output
            .query_execution()
            .context("GetQueryExecution returned no execution")?;
        let status = execution
            .status()
            .context("GetQueryExecution returned no status")?;
        let state = match status.state() {
            Some(QueryExecutionState::Queued) => ExecutionState::Queued,
            Some(QueryExecutionState::Running) => ExecutionState::Running,
            Some(QueryExecutionState::Succeeded) => ExecutionState::Succeeded,
            Some(QueryExecutionState::Failed) => ExecutionState::Failed,
            Some(QueryExecutionState::Cancelled) => ExecutionState::Cancelled,
            Some(other) => return Err(anyhow!("unrecognised query state {}", other.as_str())),
            None => ExecutionState::Queued,
        };

        let mut result = ExecutionStatus::new(state);
        if let Some(reason) = status.state_change_reason() {
            result = result.with_reason(reason);
        }
        if let Some(statistics) = execution.statistics() {
            result = result.with_statistics(convert_statistics(statistics));
        }
        Ok(result)
    }

    async fn results(
        &self,
        handle: &ExecutionHandle,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(handle.as_str())
            .set_next_token(page_token.map(str::to_string))
            .max_results(i32::try_from(max_results).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|err| anyhow!("GetQueryResults: {}", DisplayErrorContext(&err)))?;

        let result_set = output
            .result_set()
            .context("GetQueryResults returned no result set")?;

        let columns = result_set.result_set_metadata().map(|metadata| {
            metadata
                .column_info()
                .iter()
                .map(|column| column.name().to_string())
                .collect::<Vec<_>>()
        });

        let rows = result_set
            .rows()
            .iter()
            .map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect()
            })
            .collect();

        Ok(ResultPage {
            columns,
            rows,
            next_page_token: output.next_token().map(str::to_string),
        })
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> Result<()> {
        self.client
            .stop_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|err| anyhow!("StopQueryExecution: {}", DisplayErrorContext(&err)))?;
        Ok(())
    }
}

fn convert_statistics(statistics: &QueryExecutionStatistics) -> ExecutionStatistics {
    ExecutionStatistics {
        total_execution_time_millis: statistics.total_execution_time_in_millis(),
        engine_execution_time_millis: statistics.engine_execution_time_in_millis(),
        queue_time_millis: statistics.query_queue_time_in_millis(),
        data_scanned_bytes: statistics.data_scanned_in_bytes(),
    }
}
