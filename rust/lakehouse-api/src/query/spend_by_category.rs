use super::{builder::SelectBuilder, QueryRequest};
use crate::error::Result;

pub(super) const TABLE: &str = "g2_lista_gasto_categoria";

pub(super) fn to_sql(request: &QueryRequest) -> Result<String> {
    SelectBuilder::new(request.table().clone())
        .all_columns()
        .period(request.period())
        .build()
}
