//! Column type tags, raw values and rows.

mod row;
mod value;

pub use row::Row;
pub use value::{ColumnType, Value};
