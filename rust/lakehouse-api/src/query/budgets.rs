use super::{builder::SelectBuilder, QueryRequest};
use crate::error::Result;

pub(super) const TABLE: &str = "g2_presupuestos_tb";

const TOTAL_EXPR: &str =
    "(coalesce(total_mantenimiento,0) + coalesce(total_seguridad,0) + coalesce(total_limpieza,0))";

pub(super) fn to_sql(request: &QueryRequest) -> Result<String> {
    SelectBuilder::new(request.table().clone())
        .computed(TOTAL_EXPR, "total")?
        .all_columns()
        .period(request.period())
        .build()
}
