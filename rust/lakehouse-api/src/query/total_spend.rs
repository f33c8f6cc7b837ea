use super::{
    builder::{PeriodColumn, SelectBuilder},
    QueryRequest,
};
use crate::error::Result;

pub(super) const TABLE: &str = "g2_gastos_tb";
pub(super) const TOTAL_COLUMN: &str = "total_gastos";

// Expenses are stored per date, not per billing period.
const PERIOD_EXPR: &str = "date_format(fecha, '%Y-%m')";

pub(super) fn to_sql(request: &QueryRequest) -> Result<String> {
    SelectBuilder::new(request.table().clone())
        .computed("SUM(monto)", TOTAL_COLUMN)?
        .period_column(PeriodColumn::Expression(PERIOD_EXPR))
        .period(request.period())
        .build()
}
