//! SELECT statement construction with validated identifiers and escaped literals.

use crate::{
    error::{Result, ServiceError},
    time::Period,
};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

pub fn validate_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(ServiceError::Validation(format!(
            "invalid SQL identifier '{name}'"
        )))
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A fully qualified `"database"."table"` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    database: String,
    table: String,
}

impl TableRef {
    pub fn new(database: &str, table: &str) -> Result<Self> {
        Ok(Self {
            database: validate_identifier(database)?.to_string(),
            table: validate_identifier(table)?.to_string(),
        })
    }

    fn render(&self) -> String {
        format!("\"{}\".\"{}\"", self.database, self.table)
    }
}

/// Expression the period filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodColumn {
    Column(&'static str),
    /// Trusted SQL expression, e.g. a date formatting call.
    Expression(&'static str),
}

impl PeriodColumn {
    fn render(&self) -> Result<String> {
        match self {
            PeriodColumn::Column(name) => validate_identifier(name).map(str::to_string),
            PeriodColumn::Expression(expr) => Ok((*expr).to_string()),
        }
    }
}

impl Default for PeriodColumn {
    fn default() -> Self {
        PeriodColumn::Column("periodo")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    AllColumns,
    Expression { expr: &'static str, alias: String },
}

#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: TableRef,
    projections: Vec<Projection>,
    period_column: PeriodColumn,
    period: Option<Period>,
}

impl SelectBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            projections: Vec::new(),
            period_column: PeriodColumn::default(),
            period: None,
        }
    }

    pub fn all_columns(mut self) -> Self {
        self.projections.push(Projection::AllColumns);
        self
    }

    /// Adds `<expr> AS <alias>`. The expression is trusted text; the alias is validated.
    pub fn computed(mut self, expr: &'static str, alias: &str) -> Result<Self> {
        validate_identifier(alias)?;
        self.projections.push(Projection::Expression {
            expr,
            alias: alias.to_string(),
        });
        Ok(self)
    }

    pub fn period_column(mut self, column: PeriodColumn) -> Self {
        self.period_column = column;
        self
    }

    pub fn period(mut self, period: Option<&Period>) -> Self {
        self.period = period.cloned();
        self
    }

    pub fn build(&self) -> Result<String> {
        let projection = if self.projections.is_empty() {
            "*".to_string()
        } else {
            self.projections
                .iter()
                .map(|projection| match projection {
                    Projection::AllColumns => "*".to_string(),
                    Projection::Expression { expr, alias } => format!("{expr} AS {alias}"),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {}", self.table.render());
        if let Some(period) = &self.period {
            sql.push_str(&format!(
                " WHERE {} = {}",
                self.period_column.render()?,
                quote_literal(period.as_str())
            ));
        }
        Ok(sql)
    }
}
