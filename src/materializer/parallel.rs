//! Batch materialization over a rayon thread pool.
//!
//! Batches at or above the threshold are split across the global rayon pool;
//! smaller ones run on the calling thread. Results keep row order either way.

use rayon::prelude::*;

use crate::binder::BindingPlan;
use crate::error::ConversionError;
use crate::types::Row;

use super::{materialize, Instance};

/// Materializes every row of `rows` against `plan`, one result per row.
///
/// A `threshold` of zero always parallelizes.
pub fn materialize_batch(
    plan: &BindingPlan,
    rows: &[Row],
    threshold: usize,
) -> Vec<Result<Instance, ConversionError>> {
    if rows.len() < threshold.max(1) {
        return rows.iter().map(|row| materialize(plan, row)).collect();
    }

    tracing::trace!(rows = rows.len(), "materializing batch in parallel");
    rows.par_iter().map(|row| materialize(plan, row)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::binder::{ShapeResolver, TargetDescriptor};
    use crate::catalog::{ColumnDef, ColumnMetadata};
    use crate::convert::{ConverterRegistry, TargetType};
    use crate::types::{ColumnType, Value};

    #[test]
    fn test_parallel_matches_sequential() {
        let columns = ColumnMetadata::new(vec![
            ColumnDef::new("id", ColumnType::Int).unwrap(),
            ColumnDef::new("label", ColumnType::Text).unwrap(),
        ])
        .unwrap();
        let plan = ShapeResolver::new(Arc::new(ConverterRegistry::new()))
            .resolve(
                &columns,
                &TargetDescriptor::tuple(vec![TargetType::I64, TargetType::String]),
            )
            .unwrap();

        let rows: Vec<Row> = (0..500)
            .map(|i| Row::new(vec![Value::Int(i), Value::Text(format!("row-{i}"))]))
            .collect();

        let sequential = materialize_batch(&plan, &rows, usize::MAX);
        let parallel = materialize_batch(&plan, &rows, 0);
        assert_eq!(sequential, parallel);
        assert_eq!(
            parallel[42].as_ref().unwrap(),
            &Instance::Tuple(vec![Value::BigInt(42), Value::Text("row-42".into())])
        );
    }
}
