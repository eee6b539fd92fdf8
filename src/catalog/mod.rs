//! Column metadata of query results.

mod columnar;
mod schema;

pub use columnar::rows_from_record_batch;
pub use schema::{ColumnDef, ColumnMetadata, ColumnRole, Selection};
