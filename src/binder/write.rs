//! Write path: record fields to table columns.
//!
//! The inverse of read resolution. Each table column looks for the record
//! field feeding it; primary key columns must be fed, other columns are
//! written only when some field matches.

use std::sync::Arc;

use crate::catalog::ColumnMetadata;
use crate::convert::{coerce_to_column, TargetType};
use crate::error::{ConversionError, ResolutionError};
use crate::materializer::RecordInstance;
use crate::naming::{self, MatchKind};
use crate::types::{ColumnType, Row, Value};

use super::descriptor::{FieldDescriptor, RecordShape};
use super::plan::TargetSlot;

/// One field-to-column write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStep {
    /// Index of the column in the table metadata.
    pub column: usize,
    /// Column name.
    pub column_name: String,
    /// Declared column type.
    pub column_type: ColumnType,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Field name in the record.
    pub field: String,
    /// Host type of the field.
    pub target_type: TargetType,
    /// Where the value is read from in a [`RecordInstance`].
    pub source: TargetSlot,
}

/// Precomputed recipe turning records into rows for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    type_name: String,
    steps: Vec<WriteStep>,
}

impl WritePlan {
    /// Returns the record type this plan writes.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the steps in column declaration order.
    #[must_use]
    pub fn steps(&self) -> &[WriteStep] {
        &self.steps
    }

    /// Returns the names of the columns written, in row order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.column_name.as_str()).collect()
    }

    /// Builds the row for `record`, coercing each value to its column type.
    ///
    /// Unbound setter properties are written as null.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] when a value cannot be coerced or a null
    /// lands in a non-nullable column.
    pub fn to_row(&self, record: &RecordInstance) -> Result<Row, ConversionError> {
        let mut values = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let raw = match &step.source {
                TargetSlot::Param(pos) => record.arg(*pos),
                TargetSlot::Setter(name) => record.prop(name),
            }
            .unwrap_or(&Value::Null);

            if raw.is_null() && !step.nullable {
                return Err(write_error(step, "null value for non-nullable column"));
            }
            let value =
                coerce_to_column(raw, &step.column_type).map_err(|e| write_error(step, e.0))?;
            values.push(value);
        }
        Ok(Row::new(values))
    }
}

fn write_error(step: &WriteStep, reason: impl Into<String>) -> ConversionError {
    ConversionError {
        column: step.column_name.clone(),
        field: step.field.clone(),
        source_type: step.column_type.clone(),
        target_type: step.target_type.clone(),
        reason: reason.into(),
    }
}

/// Resolves the write plan for records of `shape` into `columns`.
///
/// A column is fed by the field aliased to it, else the field named exactly
/// like it, else the field named like its camelCase form or whose snake_case
/// form is the column name (`userID` feeds `user_id`). Constructor parameters
/// are searched before setters.
///
/// # Errors
///
/// Returns [`ResolutionError::MissingKeyColumn`] when a primary key column
/// has no field, [`ResolutionError::MissingColumn`] when an alias names an
/// unknown column, and [`ResolutionError::InvalidDescriptor`] for malformed
/// shapes.
pub fn resolve_write(
    columns: &ColumnMetadata,
    shape: &RecordShape,
) -> Result<WritePlan, ResolutionError> {
    shape.validate()?;

    let fields: Vec<(&FieldDescriptor, TargetSlot)> = shape
        .constructor_params
        .iter()
        .enumerate()
        .map(|(pos, f)| (f, TargetSlot::Param(pos)))
        .chain(
            shape
                .effective_setters()
                .map(|f| (f, TargetSlot::Setter(Arc::from(f.name.as_str())))),
        )
        .collect();

    for (field, _) in &fields {
        if let Some(alias) = &field.column {
            if columns.get_column(alias).is_none() {
                return Err(ResolutionError::MissingColumn {
                    target: shape.type_name.clone(),
                    field: alias.clone(),
                    available: columns.names().iter().map(ToString::to_string).collect(),
                });
            }
        }
    }

    let mut steps = Vec::new();
    for (idx, def) in columns.columns().iter().enumerate() {
        let candidates = naming::candidates(&def.name);
        let by_alias = fields
            .iter()
            .find(|(f, _)| f.column.as_deref() == Some(def.name.as_str()));
        let unaliased = || fields.iter().filter(|(f, _)| f.column.is_none());
        let found = by_alias
            .or_else(|| {
                unaliased().find(|(f, _)| candidates.matches(&f.name) == Some(MatchKind::Exact))
            })
            .or_else(|| {
                unaliased().find(|(f, _)| {
                    candidates.matches(&f.name) == Some(MatchKind::CamelCase)
                        || naming::to_snake_case(&f.name) == def.name
                })
            });

        match found {
            Some((field, slot)) => steps.push(WriteStep {
                column: idx,
                column_name: def.name.clone(),
                column_type: def.column_type.clone(),
                nullable: def.nullable,
                field: field.name.clone(),
                target_type: field.target_type.clone(),
                source: slot.clone(),
            }),
            None if def.role.is_primary_key() => {
                return Err(ResolutionError::MissingKeyColumn {
                    target: shape.type_name.clone(),
                    column: def.name.clone(),
                });
            }
            None => {}
        }
    }

    tracing::debug!(
        record = %shape.type_name,
        columns = steps.len(),
        "resolved write plan"
    );
    Ok(WritePlan {
        type_name: shape.type_name.clone(),
        steps,
    })
}
