mod budget_vs_spend;
mod budgets;
pub mod builder;
mod spend_by_category;
mod total_spend;

use crate::{
    config::AppConfig,
    error::{Result, ServiceError},
    execution::{
        poller::{Completion, CompletionPoller},
        results::{materialize, Materialized, ResultFetcher},
        submitter::ExecutionSubmitter,
        ExecutionContext, ExecutionHandle, QueryService,
    },
    time::Period,
};
use builder::TableRef;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// The analytical reports exposed over HTTP. Each one is a fixed query
/// template run through the same execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    Budgets,
    BudgetVsSpend,
    SpendByCategory,
    TotalSpend,
}

impl Report {
    pub const ALL: [Report; 4] = [
        Report::Budgets,
        Report::BudgetVsSpend,
        Report::SpendByCategory,
        Report::TotalSpend,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Report::Budgets => "/presupuesto",
            Report::BudgetVsSpend => "/presupuesto-vs-gasto",
            Report::SpendByCategory => "/gastos/categorias",
            Report::TotalSpend => "/gastos",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Report::Budgets => "budgets",
            Report::BudgetVsSpend => "budget_vs_spend",
            Report::SpendByCategory => "spend_by_category",
            Report::TotalSpend => "total_spend",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Report::Budgets => budgets::TABLE,
            Report::BudgetVsSpend => budget_vs_spend::TABLE,
            Report::SpendByCategory => spend_by_category::TABLE,
            Report::TotalSpend => total_spend::TABLE,
        }
    }

    pub fn period_required(self) -> bool {
        matches!(self, Report::BudgetVsSpend | Report::SpendByCategory)
    }

    /// Column of the first record reported as the scalar `total`, if any.
    pub fn total_column(self) -> Option<&'static str> {
        match self {
            Report::TotalSpend => Some(total_spend::TOTAL_COLUMN),
            _ => None,
        }
    }

    pub fn to_sql(self, request: &QueryRequest) -> Result<String> {
        match self {
            Report::Budgets => budgets::to_sql(request),
            Report::BudgetVsSpend => budget_vs_spend::to_sql(request),
            Report::SpendByCategory => spend_by_category::to_sql(request),
            Report::TotalSpend => total_spend::to_sql(request),
        }
    }

    /// An empty result is still a success, reported with its own headline.
    pub fn success_message(self, period: Option<&Period>, rows: usize) -> String {
        let subject = match self {
            Report::Budgets => "budgets",
            Report::BudgetVsSpend => "budget vs spend by category",
            Report::SpendByCategory => "spend by category",
            Report::TotalSpend => "total spend",
        };
        match (period, rows) {
            (Some(period), 0) => format!("No {subject} data found for period {period}"),
            (None, 0) => format!("No {subject} data found"),
            (Some(period), _) => format!("Loaded {subject} for period {period}"),
            (None, _) => format!("Loaded {subject}"),
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Report::Budgets => "Failed to load budgets from the lakehouse",
            Report::BudgetVsSpend => "Failed to load budget vs spend from the lakehouse",
            Report::SpendByCategory => "Failed to load spend by category from the lakehouse",
            Report::TotalSpend => "Failed to load total spend from the lakehouse",
        }
    }
}

/// One logical query: which table, which period, where to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    table: TableRef,
    period: Option<Period>,
    context: ExecutionContext,
}

impl QueryRequest {
    pub fn new(table: &str, period: Option<&str>, context: ExecutionContext) -> Result<Self> {
        let period = Period::parse_optional(period)?;
        let table = TableRef::new(&context.database, table)?;
        Ok(Self {
            table,
            period,
            context,
        })
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn period(&self) -> Option<&Period> {
        self.period.as_ref()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

/// Everything the response assembler needs from one pipeline run.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Report,
    pub period: Option<Period>,
    pub execution_id: ExecutionHandle,
    pub completion: Completion,
    pub materialized: Materialized,
    pub truncated: bool,
}

#[derive(Clone)]
pub struct QueryEngine {
    service: Arc<dyn QueryService>,
    config: Arc<AppConfig>,
}

impl QueryEngine {
    pub fn new(service: Arc<dyn QueryService>, config: Arc<AppConfig>) -> Self {
        Self { service, config }
    }

    /// Runs build → submit → poll → fetch → materialize for one report.
    /// Validation happens before any remote call.
    pub async fn run_report(
        &self,
        report: Report,
        period: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReportOutcome> {
        let span = info_span!("report", report = report.name(), periodo = period);
        self.execute(report, period, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        report: Report,
        period: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReportOutcome> {
        let deadline = Instant::now() + self.config.request_timeout;

        if report.period_required() && period.is_none() {
            return Err(ServiceError::Validation(
                "the 'periodo' query parameter is required".into(),
            ));
        }

        let request = QueryRequest::new(report.table(), period, self.config.execution_context())?;
        let sql = report.to_sql(&request)?;
        let service = self.service.as_ref();

        let handle = ExecutionSubmitter::new(service, request.context())
            .submit(&sql)
            .await?;

        let completion = CompletionPoller::new(service, self.config.poll_policy())
            .with_deadline(deadline)
            .wait(&handle, cancel)
            .await?;

        let fetched = ResultFetcher::new(service, self.config.fetch_policy())
            .fetch(&handle)
            .await?;
        let truncated = fetched.truncated;
        let materialized = materialize(fetched)?;

        info!(
            execution_id = %handle,
            rows = materialized.records.len(),
            truncated,
            "report ready"
        );

        Ok(ReportOutcome {
            report,
            period: request.period().cloned(),
            execution_id: handle,
            completion,
            materialized,
            truncated,
        })
    }
}
