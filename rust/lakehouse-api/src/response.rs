//! Success and failure envelopes returned by every report endpoint.

use crate::{
    error::ServiceError,
    execution::{results::Record, ExecutionHandle},
    query::{Report, ReportOutcome},
    time::Period,
};
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub query_execution_id: ExecutionHandle,
    pub execution_time_millis: Option<i64>,
    pub engine_execution_time_millis: Option<i64>,
    pub queue_time_millis: Option<i64>,
    pub data_scanned_bytes: Option<i64>,
    pub status_checks: u32,
    pub columns: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    pub success: bool,
    pub message: String,
    pub total_rows: usize,
    pub periodo: Option<Period>,
    pub data: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    pub metadata: ExecutionMetadata,
    pub timestamp: String,
}

impl SuccessEnvelope {
    pub fn assemble(outcome: ReportOutcome) -> Self {
        let ReportOutcome {
            report,
            period,
            execution_id,
            completion,
            materialized,
            truncated,
        } = outcome;

        // A missing or null aggregate means nothing matched the filter.
        let total = report.total_column().map(|column| {
            materialized
                .records
                .first()
                .and_then(|record| record.get(column))
                .and_then(|value| value.as_f64())
                .unwrap_or(0.0)
        });

        let statistics = completion.statistics;
        Self {
            success: true,
            message: report.success_message(period.as_ref(), materialized.records.len()),
            total_rows: materialized.records.len(),
            periodo: period,
            data: materialized.records,
            total,
            metadata: ExecutionMetadata {
                query_execution_id: execution_id,
                execution_time_millis: statistics.total_execution_time_millis,
                engine_execution_time_millis: statistics.engine_execution_time_millis,
                queue_time_millis: statistics.queue_time_millis,
                data_scanned_bytes: statistics.data_scanned_bytes,
                status_checks: completion.status_checks,
                columns: materialized.columns,
                truncated,
            },
            timestamp: timestamp(),
        }
    }
}

impl IntoResponse for SuccessEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error: String,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: error.into(),
            timestamp: timestamp(),
        }
    }
}

/// A pipeline failure attributed to the report that was being served.
#[derive(Debug)]
pub struct ReportFailure {
    pub report: Report,
    pub error: ServiceError,
}

impl ReportFailure {
    pub fn new(report: Report, error: ServiceError) -> Self {
        Self { report, error }
    }
}

impl IntoResponse for ReportFailure {
    fn into_response(self) -> Response {
        let message = match &self.error {
            ServiceError::Validation(detail) => detail.clone(),
            _ => self.report.failure_message().to_string(),
        };
        self.error.into_response_with_message(message)
    }
}
