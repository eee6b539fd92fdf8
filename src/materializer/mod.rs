//! Row materialization.
//!
//! Applies a [`BindingPlan`] to one raw [`Row`], producing an [`Instance`].
//! Every slot is converted first and the instance is assembled only once all
//! of them succeeded, so a failing row never yields a partially built value.
//!
//! Materialization holds no state of its own: the same plan can be applied
//! from any number of threads at once.

mod parallel;
mod stream;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::binder::{BindingPlan, BindingStep, PlanShape, TargetSlot};
use crate::error::{ConversionError, Result, RowbindError};
use crate::mapping::{FromValue, IntoValue};
use crate::types::{Row, Value};

pub use parallel::materialize_batch;
pub use stream::{materialize_stream, MaterializeIter};

/// How a row sequence reacts to per-row conversion failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Stop at the first failing row.
    #[default]
    FailFast,
    /// Drop failing rows, logging each at `warn`.
    Skip,
    /// Keep going and return the failures next to the successes.
    Collect,
}

/// A materialized target value.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    /// Tuple elements in position order.
    Tuple(Vec<Value>),
    /// Record built from constructor arguments and setter properties.
    Record(RecordInstance),
    /// Key and value instances.
    Pair(Box<Instance>, Box<Instance>),
}

impl Instance {
    /// Returns the tuple elements.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if this is not a tuple.
    pub fn into_tuple(self) -> Result<Vec<Value>> {
        match self {
            Instance::Tuple(values) => Ok(values),
            other => Err(mismatch("tuple", &other)),
        }
    }

    /// Returns the record.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if this is not a record.
    pub fn into_record(self) -> Result<RecordInstance> {
        match self {
            Instance::Record(record) => Ok(record),
            other => Err(mismatch("record", &other)),
        }
    }

    /// Returns the key and value instances.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if this is not a pair.
    pub fn into_pair(self) -> Result<(Instance, Instance)> {
        match self {
            Instance::Pair(key, value) => Ok((*key, *value)),
            other => Err(mismatch("pair", &other)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Instance::Tuple(_) => "tuple",
            Instance::Record(_) => "record",
            Instance::Pair(..) => "pair",
        }
    }
}

fn mismatch(expected: &str, found: &Instance) -> RowbindError {
    RowbindError::ExtractionError(format!("expected {expected} instance, found {}", found.kind()))
}

/// A record: constructor arguments plus the setter properties that were bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordInstance {
    type_name: Arc<str>,
    args: Vec<Value>,
    props: Vec<(Arc<str>, Value)>,
}

impl RecordInstance {
    /// Creates an empty record, typically to feed the write path.
    #[must_use]
    pub fn new(type_name: &str) -> Self {
        RecordInstance {
            type_name: Arc::from(type_name),
            args: Vec::new(),
            props: Vec::new(),
        }
    }

    /// Appends a constructor argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl IntoValue) -> Self {
        self.args.push(value.into_value());
        self
    }

    /// Sets a property.
    #[must_use]
    pub fn with_prop(mut self, name: &str, value: impl IntoValue) -> Self {
        let value = value.into_value();
        match self.props.iter_mut().find(|(n, _)| &**n == name) {
            Some(slot) => slot.1 = value,
            None => self.props.push((Arc::from(name), value)),
        }
        self
    }

    /// Returns the record type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the constructor arguments in declared order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the constructor argument at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns the bound setter properties in binding order.
    #[must_use]
    pub fn props(&self) -> &[(Arc<str>, Value)] {
        &self.props
    }

    /// Returns the setter property `name`, if it was bound.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    /// Moves the constructor argument at `index` out as `T`.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if the index is out of range or the value
    /// does not fit `T`.
    pub fn take_arg<T: FromValue>(&mut self, index: usize) -> Result<T> {
        let slot = self.args.get_mut(index).ok_or_else(|| {
            RowbindError::ExtractionError(format!(
                "{} has no constructor argument {index}",
                self.type_name
            ))
        })?;
        let value = std::mem::replace(slot, Value::Null);
        T::from_value(value).map_err(|e| {
            RowbindError::ExtractionError(format!("{} argument {index}: {e}", self.type_name))
        })
    }

    /// Moves the setter property `name` out as `T`; `None` if it was not bound.
    ///
    /// # Errors
    ///
    /// Returns an extraction error if the value does not fit `T`.
    pub fn take_prop<T: FromValue>(&mut self, name: &str) -> Result<Option<T>> {
        let Some(pos) = self.props.iter().position(|(n, _)| &**n == name) else {
            return Ok(None);
        };
        let (_, value) = self.props.swap_remove(pos);
        T::from_value(value).map(Some).map_err(|e| {
            RowbindError::ExtractionError(format!("{} property '{name}': {e}", self.type_name))
        })
    }
}

/// Applies `plan` to `row`.
///
/// # Errors
///
/// Returns a [`ConversionError`] naming the column, field and types of the
/// first step that fails. The row is abandoned; the plan stays valid.
pub fn materialize(plan: &BindingPlan, row: &Row) -> std::result::Result<Instance, ConversionError> {
    match plan.shape() {
        PlanShape::Tuple { arity } => {
            let mut slots = vec![Value::Null; *arity];
            for step in plan.steps() {
                let value = apply(step, row)?;
                if let TargetSlot::Param(pos) = step.target {
                    if let Some(slot) = slots.get_mut(pos) {
                        *slot = value;
                    }
                }
            }
            Ok(Instance::Tuple(slots))
        }
        PlanShape::Record {
            type_name,
            param_count,
        } => {
            let mut args = vec![Value::Null; *param_count];
            let mut props = Vec::new();
            for step in plan.steps() {
                let value = apply(step, row)?;
                match &step.target {
                    TargetSlot::Param(pos) => {
                        if let Some(slot) = args.get_mut(*pos) {
                            *slot = value;
                        }
                    }
                    TargetSlot::Setter(name) => props.push((Arc::clone(name), value)),
                }
            }
            Ok(Instance::Record(RecordInstance {
                type_name: Arc::clone(type_name),
                args,
                props,
            }))
        }
        PlanShape::Pair { key, value } => {
            let key = materialize(key, row)?;
            let value = materialize(value, row)?;
            Ok(Instance::Pair(Box::new(key), Box::new(value)))
        }
    }
}

fn apply(step: &BindingStep, row: &Row) -> std::result::Result<Value, ConversionError> {
    let raw = row.get(step.source_column).ok_or_else(|| {
        step.conversion_error(format!(
            "row has {} values, no value at column index {}",
            row.len(),
            step.source_column
        ))
    })?;
    step.converter
        .convert(raw)
        .map_err(|e| step.conversion_error(e.0))
}
