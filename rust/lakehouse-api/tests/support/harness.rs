use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use lakehouse_api::{
    config::AppConfig,
    execution::{
        ExecutionContext, ExecutionHandle, ExecutionState, ExecutionStatistics, ExecutionStatus,
        QueryService, ResultPage,
    },
    server::Server,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{collections::VecDeque, sync::Arc, sync::Once, time::Duration};
use tower::ServiceExt;

static TRACING_INIT: Once = Once::new();

/// In-memory stand-in for the Athena API. Statuses and pages are served in
/// the order they were scripted; once statuses run out the fallback repeats.
#[derive(Default)]
pub struct FakeAthena {
    submit_error: Option<String>,
    statuses: Mutex<VecDeque<ExecutionStatus>>,
    fallback: Option<ExecutionStatus>,
    pages: Mutex<VecDeque<Result<ResultPage, String>>>,
    submitted: Mutex<Vec<(String, ExecutionContext)>>,
    status_calls: Mutex<usize>,
    cancelled: Mutex<Vec<ExecutionHandle>>,
}

impl FakeAthena {
    pub fn succeeding() -> Self {
        Self::default().then_forever(
            ExecutionStatus::new(ExecutionState::Succeeded).with_statistics(ExecutionStatistics {
                total_execution_time_millis: Some(950),
                engine_execution_time_millis: Some(700),
                queue_time_millis: Some(80),
                data_scanned_bytes: Some(2_048),
            }),
        )
    }

    pub fn failing_submit(message: &str) -> Self {
        Self {
            submit_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn then_forever(mut self, status: ExecutionStatus) -> Self {
        self.fallback = Some(status);
        self
    }

    pub fn with_status(self, status: ExecutionStatus) -> Self {
        self.statuses.lock().push_back(status);
        self
    }

    pub fn with_rows(self, rows: &[&[Option<&str>]]) -> Self {
        let rows = rows
            .iter()
            .map(|cells| cells.iter().map(|cell| cell.map(str::to_string)).collect())
            .collect();
        self.pages.lock().push_back(Ok(ResultPage {
            columns: None,
            rows,
            next_page_token: None,
        }));
        self
    }

    pub fn with_page(self, page: ResultPage) -> Self {
        self.pages.lock().push_back(Ok(page));
        self
    }

    pub fn with_page_error(self, message: &str) -> Self {
        self.pages.lock().push_back(Err(message.to_string()));
        self
    }

    pub fn submitted_queries(&self) -> Vec<String> {
        self.submitted
            .lock()
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }

    pub fn submitted_contexts(&self) -> Vec<ExecutionContext> {
        self.submitted
            .lock()
            .iter()
            .map(|(_, context)| context.clone())
            .collect()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock()
    }

    pub fn cancelled(&self) -> Vec<ExecutionHandle> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl QueryService for FakeAthena {
    async fn submit(
        &self,
        query: &str,
        context: &ExecutionContext,
    ) -> anyhow::Result<ExecutionHandle> {
        if let Some(message) = &self.submit_error {
            anyhow::bail!("{message}");
        }
        let mut submitted = self.submitted.lock();
        submitted.push((query.to_string(), context.clone()));
        Ok(ExecutionHandle::new(format!(
            "00000000-0000-0000-0000-{:012}",
            submitted.len()
        )))
    }

    async fn status(&self, _handle: &ExecutionHandle) -> anyhow::Result<ExecutionStatus> {
        *self.status_calls.lock() += 1;
        let next = self.statuses.lock().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| anyhow::anyhow!("no scripted status left"))
    }

    async fn results(
        &self,
        _handle: &ExecutionHandle,
        _page_token: Option<&str>,
        _max_results: u32,
    ) -> anyhow::Result<ResultPage> {
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

pub struct TestHarness {
    router: Router,
    pub athena: Arc<FakeAthena>,
}

impl TestHarness {
    pub fn new(athena: FakeAthena) -> Self {
        Self::with_config(athena, |_| {})
    }

    pub fn with_config(athena: FakeAthena, adjust: impl FnOnce(&mut AppConfig)) -> Self {
        TRACING_INIT.call_once(|| {
            let _ = tracing_subscriber::fmt::try_init();
        });

        let mut config = test_config();
        adjust(&mut config);
        let athena = Arc::new(athena);
        let server = Server::new(config, athena.clone());

        Self {
            router: server.router(),
            athena,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        self.send(Method::GET, uri).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("response body should be readable");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON")
        };
        (status, headers, value)
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::from_vars(vec![
        ("ATHENA_DATABASE".to_string(), "lakehouse_test".to_string()),
        ("ATHENA_WORKGROUP".to_string(), "tests".to_string()),
        (
            "ATHENA_OUTPUT_LOCATION".to_string(),
            "s3://lakehouse-tests/results/".to_string(),
        ),
    ])
    .expect("test config should parse");
    config.poll_interval = Duration::from_millis(5);
    config.max_poll_attempts = 20;
    config
}
