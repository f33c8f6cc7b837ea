//! Scripted in-memory `QueryService` for unit tests.

use super::{
    ExecutionContext, ExecutionHandle, ExecutionState, ExecutionStatus, QueryService, RawRow,
    ResultPage,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::VecDeque, time::Duration};

pub(crate) fn context() -> ExecutionContext {
    ExecutionContext {
        catalog: "AwsDataCatalog".into(),
        database: "lakehouse_db".into(),
        output_location: "s3://results/tmp/".into(),
        workgroup: "primary".into(),
    }
}

pub(crate) fn row(cells: &[Option<&str>]) -> RawRow {
    cells.iter().map(|cell| cell.map(str::to_string)).collect()
}

pub(crate) fn text_row(cells: &[&str]) -> RawRow {
    cells.iter().map(|cell| Some(cell.to_string())).collect()
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    submit_error: Option<String>,
    statuses: Mutex<VecDeque<Result<ExecutionStatus, String>>>,
    fallback_status: Option<ExecutionStatus>,
    status_delay: Option<Duration>,
    pages: Mutex<VecDeque<Result<ResultPage, String>>>,
    submitted: Mutex<Vec<String>>,
    status_calls: Mutex<usize>,
    page_requests: Mutex<Vec<(Option<String>, u32)>>,
    cancelled: Mutex<Vec<ExecutionHandle>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    pub(crate) fn with_states(self, states: &[ExecutionState]) -> Self {
        self.statuses
            .lock()
            .extend(states.iter().map(|state| Ok(ExecutionStatus::new(*state))));
        self
    }

    pub(crate) fn with_status(self, status: ExecutionStatus) -> Self {
        self.statuses.lock().push_back(Ok(status));
        self
    }

    pub(crate) fn with_status_error(self, message: &str) -> Self {
        self.statuses.lock().push_back(Err(message.to_string()));
        self
    }

    /// Status returned once the script is exhausted.
    pub(crate) fn then_forever(mut self, state: ExecutionState) -> Self {
        self.fallback_status = Some(ExecutionStatus::new(state));
        self
    }

    pub(crate) fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) fn with_page(self, page: ResultPage) -> Self {
        self.pages.lock().push_back(Ok(page));
        self
    }

    pub(crate) fn with_page_error(self, message: &str) -> Self {
        self.pages.lock().push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    pub(crate) fn status_calls(&self) -> usize {
        *self.status_calls.lock()
    }

    pub(crate) fn page_requests(&self) -> Vec<(Option<String>, u32)> {
        self.page_requests.lock().clone()
    }

    pub(crate) fn cancelled(&self) -> Vec<ExecutionHandle> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn submit(
        &self,
        query: &str,
        _context: &ExecutionContext,
    ) -> anyhow::Result<ExecutionHandle> {
        let mut submitted = self.submitted.lock();
        submitted.push(query.to_string());
        if let Some(message) = &self.submit_error {
            anyhow::bail!("{message}");
        }
        Ok(ExecutionHandle::new(format!("exec-{}", submitted.len())))
    }

    async fn status(&self, _handle: &ExecutionHandle) -> anyhow::Result<ExecutionStatus> {
        *self.status_calls.lock() += 1;
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.statuses.lock().pop_front();
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(self
                .fallback_status
                .clone()
                .unwrap_or_else(|| ExecutionStatus::new(ExecutionState::Succeeded))),
        }
    }

    async fn results(
        &self,
        _handle: &ExecutionHandle,
        page_token: Option<&str>,
        max_results: u32,
    ) -> anyhow::Result<ResultPage> {
        self.page_requests
            .lock()
            .push((page_token.map(str::to_string), max_results));
        let next = self.pages.lock().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(ResultPage::default()),
        }
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> anyhow::Result<()> {
        self.cancelled.lock().push(handle.clone());
        Ok(())
    }
}
