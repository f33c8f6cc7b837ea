//! Result retrieval and conversion of the row-oriented wire format into records.

use super::{ExecutionHandle, QueryService, RawCell, RawRow};
use crate::error::{Result, ServiceError};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Number;
use tracing::{debug, warn};

/// The service never returns more than this many rows per page.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub page_size: u32,
    pub max_rows: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_rows: 10_000,
        }
    }
}

/// Rows as retrieved, header row included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedResult {
    pub columns: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
    pub pages: usize,
    pub truncated: bool,
}

pub struct ResultFetcher<'a> {
    service: &'a dyn QueryService,
    policy: FetchPolicy,
}

impl<'a> ResultFetcher<'a> {
    pub fn new(service: &'a dyn QueryService, policy: FetchPolicy) -> Self {
        Self { service, policy }
    }

    /// Follows continuation tokens until the result set is exhausted or
    /// `max_rows` data rows were collected. Any page failure discards what was
    /// gathered so far.
    pub async fn fetch(&self, handle: &ExecutionHandle) -> Result<FetchedResult> {
        let page_size = self.policy.page_size.clamp(1, MAX_PAGE_SIZE);
        let max_rows = self.policy.max_rows.max(1);
        let mut result = FetchedResult::default();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .service
                .results(handle, token.as_deref(), page_size)
                .await
                .map_err(ServiceError::ResultFetch)?;
            result.pages += 1;

            if result.pages == 1 {
                result.columns = page.columns.filter(|columns| !columns.is_empty());
            }
            result.rows.extend(page.rows);
            debug!(
                execution_id = %handle,
                page = result.pages,
                rows = result.rows.len(),
                "fetched result page"
            );

            let data_rows = result.rows.len().saturating_sub(1);
            if data_rows >= max_rows {
                if data_rows > max_rows || page.next_page_token.is_some() {
                    result.truncated = true;
                    result.rows.truncate(max_rows + 1);
                    warn!(execution_id = %handle, max_rows, "result set truncated at row cap");
                }
                break;
            }

            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(result)
    }
}

/// A materialized cell: null, a number, or text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(Number),
    Text(String),
}

impl CellValue {
    /// Promotes a cell to a number only when the whole string parses as one.
    pub fn coerce(raw: RawCell) -> Self {
        let Some(text) = raw else {
            return CellValue::Null;
        };

        if let Ok(value) = text.parse::<i64>() {
            return CellValue::Number(value.into());
        }
        if let Ok(value) = text.parse::<u64>() {
            return CellValue::Number(value.into());
        }
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return CellValue::Number(number);
        }

        CellValue::Text(text)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) => number.as_f64(),
            _ => None,
        }
    }
}

/// One data row keyed by column name, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn from_cells(columns: &[String], cells: RawRow) -> Self {
        let mut record = Record {
            fields: Vec::with_capacity(columns.len()),
        };
        for (column, cell) in columns.iter().zip(cells) {
            record.insert(column.clone(), CellValue::coerce(cell));
        }
        record
    }

    /// Replaces the value of an existing column in place, otherwise appends.
    pub fn insert(&mut self, column: String, value: CellValue) {
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Materialized {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

/// Consumes the first row as the header and turns every following row into a
/// record. Column names from metadata win over the header row's values.
pub fn materialize(result: FetchedResult) -> Result<Materialized> {
    let mut rows = result.rows.into_iter();

    let Some(header) = rows.next() else {
        return Ok(Materialized {
            columns: result.columns.unwrap_or_default(),
            records: Vec::new(),
        });
    };

    let columns = match result.columns {
        Some(columns) if !columns.is_empty() => columns,
        _ => header
            .into_iter()
            .enumerate()
            .map(|(idx, cell)| cell.unwrap_or_else(|| format!("_col{idx}")))
            .collect(),
    };

    let records = rows
        .enumerate()
        .map(|(idx, row)| {
            if row.len() != columns.len() {
                return Err(ServiceError::ResultFetch(anyhow::anyhow!(
                    "data row {} has {} cells but the header has {} columns",
                    idx + 1,
                    row.len(),
                    columns.len()
                )));
            }
            Ok(Record::from_cells(&columns, row))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Materialized { columns, records })
}
