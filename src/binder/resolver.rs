//! Target shape resolution.
//!
//! Turns a (column metadata, target descriptor) pair into a [`BindingPlan`].
//! Resolution is a pure function of its inputs and the converter registry:
//! resolving the same pair twice yields structurally equal plans.

use std::sync::Arc;

use crate::catalog::ColumnMetadata;
use crate::convert::{ConverterRef, ConverterRegistry, TargetType};
use crate::error::ResolutionError;

use super::descriptor::{FieldDescriptor, RecordShape, TargetDescriptor, TupleShape};
use super::matcher::ColumnMatcher;
use super::pair::decompose;
use super::plan::{BindingPlan, BindingStep, TargetSlot};

/// Resolves target descriptors against column metadata.
#[derive(Debug, Clone)]
pub struct ShapeResolver {
    registry: Arc<ConverterRegistry>,
}

impl ShapeResolver {
    /// Creates a resolver that looks converters up in `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        ShapeResolver { registry }
    }

    /// Returns the registry used for converter lookup.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    /// Builds the binding plan mapping `columns` onto `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] when a required field has no column, a
    /// camelCase match is ambiguous, a tuple's arity differs from the column
    /// count, a converter is missing, or the descriptor is malformed.
    pub fn resolve(
        &self,
        columns: &ColumnMetadata,
        target: &TargetDescriptor,
    ) -> Result<BindingPlan, ResolutionError> {
        let all: Vec<usize> = (0..columns.len()).collect();
        let plan = self.resolve_subset(columns, &all, target)?;
        tracing::debug!(
            shape = %target,
            columns = columns.len(),
            steps = plan.step_count(),
            "resolved binding plan"
        );
        Ok(plan)
    }

    fn resolve_subset(
        &self,
        columns: &ColumnMetadata,
        indices: &[usize],
        target: &TargetDescriptor,
    ) -> Result<BindingPlan, ResolutionError> {
        match target {
            TargetDescriptor::Tuple(shape) => self.resolve_tuple(columns, indices, shape),
            TargetDescriptor::Record(shape) => self.resolve_record(columns, indices, shape),
            TargetDescriptor::Pair(key, value) => {
                let partition = decompose(columns, key, value)?;
                let key_plan = self.resolve_subset(columns, &partition.key, key)?;
                let value_plan = self.resolve_subset(columns, &partition.value, value)?;
                Ok(BindingPlan::pair(key_plan, value_plan))
            }
        }
    }

    fn resolve_tuple(
        &self,
        columns: &ColumnMetadata,
        indices: &[usize],
        shape: &TupleShape,
    ) -> Result<BindingPlan, ResolutionError> {
        if shape.arity() != indices.len() {
            return Err(ResolutionError::ArityMismatch {
                expected: shape.arity(),
                actual: indices.len(),
            });
        }

        let steps = indices
            .iter()
            .zip(&shape.element_types)
            .enumerate()
            .map(|(pos, (&col, target_type))| {
                self.step(columns, col, pos.to_string(), target_type, TargetSlot::Param(pos))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BindingPlan::tuple(shape.arity(), steps))
    }

    fn resolve_record(
        &self,
        columns: &ColumnMetadata,
        indices: &[usize],
        shape: &RecordShape,
    ) -> Result<BindingPlan, ResolutionError> {
        shape.validate()?;
        let matcher = ColumnMatcher::for_record(columns, indices, shape);
        let mut steps = Vec::with_capacity(shape.constructor_params.len());

        for (pos, param) in shape.constructor_params.iter().enumerate() {
            let col = matcher.require(&shape.type_name, param)?;
            steps.push(self.field_step(columns, col, param, TargetSlot::Param(pos))?);
        }

        for setter in shape.effective_setters() {
            let Some(col) = matcher.find(setter)? else {
                continue;
            };
            let slot = TargetSlot::Setter(Arc::from(setter.name.as_str()));
            steps.push(self.field_step(columns, col, setter, slot)?);
        }

        Ok(BindingPlan::record(
            &shape.type_name,
            shape.constructor_params.len(),
            steps,
        ))
    }

    fn field_step(
        &self,
        columns: &ColumnMetadata,
        col: usize,
        field: &FieldDescriptor,
        slot: TargetSlot,
    ) -> Result<BindingStep, ResolutionError> {
        self.step(columns, col, field.name.clone(), &field.target_type, slot)
    }

    fn step(
        &self,
        columns: &ColumnMetadata,
        col: usize,
        field: String,
        target_type: &TargetType,
        target: TargetSlot,
    ) -> Result<BindingStep, ResolutionError> {
        let def = columns.get(col).ok_or_else(|| {
            ResolutionError::InvalidDescriptor(format!("column index {col} out of range"))
        })?;
        let converter: ConverterRef = self
            .registry
            .lookup(&def.column_type, target_type)
            .map_err(|e| e.for_column(&def.name))?;
        Ok(BindingStep {
            source_column: col,
            column_name: def.name.clone(),
            field,
            converter,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::plan::PlanShape;
    use crate::catalog::ColumnDef;
    use crate::types::ColumnType;

    fn resolver() -> ShapeResolver {
        ShapeResolver::new(Arc::new(ConverterRegistry::new()))
    }

    fn word_count() -> ColumnMetadata {
        ColumnMetadata::new(vec![
            ColumnDef::new("word", ColumnType::Text).unwrap(),
            ColumnDef::new("count", ColumnType::Int).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_tuple_positional() {
        let target = TargetDescriptor::tuple(vec![TargetType::String, TargetType::I64]);
        let plan = resolver().resolve(&word_count(), &target).unwrap();
        assert_eq!(plan.shape(), &PlanShape::Tuple { arity: 2 });
        assert_eq!(plan.steps()[1].source_column, 1);
        assert_eq!(plan.steps()[1].target, TargetSlot::Param(1));
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let target = TargetDescriptor::tuple(vec![TargetType::String]);
        let err = resolver().resolve(&word_count(), &target).unwrap_err();
        assert_eq!(err, ResolutionError::ArityMismatch { expected: 1, actual: 2 });
    }

    #[test]
    fn test_tuple_no_converter() {
        let target = TargetDescriptor::tuple(vec![TargetType::I64, TargetType::I64]);
        let err = resolver().resolve(&word_count(), &target).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoConverter {
                column: "word".into(),
                source_type: ColumnType::Text,
                target_type: TargetType::I64,
            }
        );
    }

    #[test]
    fn test_record_binds_params_in_declared_order() {
        let shape = RecordShape::new("WordCount")
            .param::<i64>("count")
            .param::<String>("word");
        let plan = resolver().resolve(&word_count(), &shape.into()).unwrap();
        let cols: Vec<_> = plan.steps().iter().map(|s| s.source_column).collect();
        assert_eq!(cols, vec![1, 0]);
    }

    #[test]
    fn test_record_missing_param() {
        let shape = RecordShape::new("WordCount")
            .param::<String>("word")
            .param::<i64>("frequency");
        let err = resolver().resolve(&word_count(), &shape.into()).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::MissingColumn { ref field, .. } if field == "frequency"
        ));
    }

    #[test]
    fn test_exact_column_does_not_also_feed_camel_case_param() {
        let cols = ColumnMetadata::new(vec![ColumnDef::new("user_name", ColumnType::Text).unwrap()])
            .unwrap();
        let shape = RecordShape::new("U")
            .param::<String>("user_name")
            .param::<String>("userName");
        let err = resolver().resolve(&cols, &shape.into()).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::MissingColumn { ref field, .. } if field == "userName"
        ));
    }

    #[test]
    fn test_exact_column_does_not_also_feed_camel_case_setter() {
        let cols = ColumnMetadata::new(vec![
            ColumnDef::new("user_name", ColumnType::Text).unwrap(),
            ColumnDef::new("visits", ColumnType::Int).unwrap(),
        ])
        .unwrap();
        let shape = RecordShape::new("U")
            .param::<String>("user_name")
            .setter::<String>("userName")
            .setter::<i64>("visits");
        let plan = resolver().resolve(&cols, &shape.into()).unwrap();
        let fields: Vec<_> = plan.steps().iter().map(|s| s.field.as_str()).collect();
        assert_eq!(fields, vec!["user_name", "visits"]);
    }

    #[test]
    fn test_unmatched_setter_skipped() {
        let shape = RecordShape::new("WordCount")
            .param::<String>("word")
            .setter::<i64>("count")
            .setter::<String>("language");
        let plan = resolver().resolve(&word_count(), &shape.into()).unwrap();
        assert_eq!(plan.step_count(), 2);
        assert_eq!(plan.steps()[1].target, TargetSlot::Setter(Arc::from("count")));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let shape: TargetDescriptor = RecordShape::new("WordCount")
            .param::<String>("word")
            .param::<i64>("count")
            .into();
        let r = resolver();
        assert_eq!(
            r.resolve(&word_count(), &shape).unwrap(),
            r.resolve(&word_count(), &shape).unwrap()
        );
    }
}
