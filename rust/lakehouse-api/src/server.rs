use crate::{
    config::AppConfig,
    error::ServiceError,
    execution::QueryService,
    query::Report,
    response::{ReportFailure, SuccessEnvelope},
    state::AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

const CORS_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
const CORS_ALLOW_METHODS: &str = "GET,OPTIONS";

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

#[derive(Debug, Default, Deserialize)]
struct ReportParams {
    periodo: Option<String>,
}

impl Server {
    pub fn new(config: AppConfig, service: Arc<dyn QueryService>) -> Self {
        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config), service);
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new().route("/healthz", get(Self::health));
        for report in Report::ALL {
            router = router.route(report.path(), report_route(report));
        }

        router
            .with_state(self.state.clone())
            .layer(SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(CORS_ALLOW_METHODS),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(CORS_ALLOW_HEADERS),
            ))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(
            %addr,
            database = %self.config.athena_database,
            workgroup = %self.config.athena_workgroup,
            "lakehouse API listening"
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }
}

fn report_route(report: Report) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>,
              params: Result<Query<ReportParams>, QueryRejection>| async move {
            match params {
                Ok(Query(params)) => run_report(state, report, params).await,
                Err(rejection) => ReportFailure::new(
                    report,
                    ServiceError::Validation(rejection.body_text()),
                )
                .into_response(),
            }
        },
    )
    .options(preflight)
    .fallback(method_not_allowed)
}

/// Runs the pipeline on its own task. Dropping the request future (client
/// disconnect) cancels the token, which stops polling and cancels the execution.
async fn run_report(state: AppState, report: Report, params: ReportParams) -> Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let engine = state.query.clone();
    let task = tokio::spawn(async move {
        engine
            .run_report(report, params.periodo.as_deref(), &cancel)
            .await
    });

    match task.await {
        Ok(Ok(outcome)) => SuccessEnvelope::assemble(outcome).into_response(),
        Ok(Err(err)) => ReportFailure::new(report, err).into_response(),
        Err(err) => ReportFailure::new(
            report,
            ServiceError::Internal(anyhow::anyhow!("report task failed: {err}")),
        )
        .into_response(),
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed(method: Method) -> ServiceError {
    ServiceError::MethodNotAllowed(method.to_string())
}
