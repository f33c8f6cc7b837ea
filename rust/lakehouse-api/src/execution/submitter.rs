use super::{ExecutionContext, ExecutionHandle, QueryService};
use crate::error::{Result, ServiceError};
use tracing::{debug, info};

/// Sends query text to the remote service. A single call, never retried.
pub struct ExecutionSubmitter<'a> {
    service: &'a dyn QueryService,
    context: &'a ExecutionContext,
}

impl<'a> ExecutionSubmitter<'a> {
    pub fn new(service: &'a dyn QueryService, context: &'a ExecutionContext) -> Self {
        Self { service, context }
    }

    pub async fn submit(&self, query: &str) -> Result<ExecutionHandle> {
        debug!(
            database = %self.context.database,
            workgroup = %self.context.workgroup,
            query,
            "submitting query"
        );

        let handle = self
            .service
            .submit(query, self.context)
            .await
            .map_err(ServiceError::Submission)?;

        info!(execution_id = %handle, "query submitted");
        Ok(handle)
    }
}
