//! Binding plans: precomputed column-to-slot recipes.

use std::fmt;
use std::sync::Arc;

use crate::convert::ConverterRef;
use crate::error::ConversionError;

/// Where a converted value lands in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSlot {
    /// Constructor argument or tuple element at this position.
    Param(usize),
    /// Setter property with this name.
    Setter(Arc<str>),
}

/// One column-to-slot binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingStep {
    /// Index of the column in the result row.
    pub source_column: usize,
    /// Column name, kept for error reporting.
    pub column_name: String,
    /// Field name, or the element position for tuples.
    pub field: String,
    /// Conversion from the column type to the field type.
    pub converter: ConverterRef,
    /// Destination slot.
    pub target: TargetSlot,
}

impl BindingStep {
    /// Builds a conversion error carrying this step's context.
    #[must_use]
    pub fn conversion_error(&self, reason: impl Into<String>) -> ConversionError {
        ConversionError {
            column: self.column_name.clone(),
            field: self.field.clone(),
            source_type: self.converter.source_type().clone(),
            target_type: self.converter.target_type().clone(),
            reason: reason.into(),
        }
    }
}

/// Shape of the instance a plan builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanShape {
    /// Positional tuple.
    Tuple { arity: usize },
    /// Record built from constructor arguments plus setters.
    Record {
        type_name: Arc<str>,
        param_count: usize,
    },
    /// Key-value pair of two independent sub-plans.
    Pair {
        key: Box<BindingPlan>,
        value: Box<BindingPlan>,
    },
}

/// A reusable recipe mapping result columns onto a target shape.
///
/// Computed once per (columns, target) pair and shared read-only by every
/// row of the result, across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    shape: PlanShape,
    steps: Vec<BindingStep>,
}

impl BindingPlan {
    pub(crate) fn tuple(arity: usize, steps: Vec<BindingStep>) -> Self {
        BindingPlan {
            shape: PlanShape::Tuple { arity },
            steps,
        }
    }

    pub(crate) fn record(type_name: &str, param_count: usize, steps: Vec<BindingStep>) -> Self {
        BindingPlan {
            shape: PlanShape::Record {
                type_name: Arc::from(type_name),
                param_count,
            },
            steps,
        }
    }

    pub(crate) fn pair(key: BindingPlan, value: BindingPlan) -> Self {
        BindingPlan {
            shape: PlanShape::Pair {
                key: Box::new(key),
                value: Box::new(value),
            },
            steps: Vec::new(),
        }
    }

    /// Returns the plan shape.
    #[must_use]
    pub fn shape(&self) -> &PlanShape {
        &self.shape
    }

    /// Returns this plan's own steps; pair plans keep theirs in the sub-plans.
    #[must_use]
    pub fn steps(&self) -> &[BindingStep] {
        &self.steps
    }

    /// Returns the number of steps, including those of sub-plans.
    #[must_use]
    pub fn step_count(&self) -> usize {
        match &self.shape {
            PlanShape::Pair { key, value } => key.step_count() + value.step_count(),
            _ => self.steps.len(),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match &self.shape {
            PlanShape::Tuple { arity } => writeln!(f, "{pad}Tuple[{arity}]")?,
            PlanShape::Record {
                type_name,
                param_count,
            } => writeln!(f, "{pad}Record {type_name} ({param_count} params)")?,
            PlanShape::Pair { key, value } => {
                writeln!(f, "{pad}Pair")?;
                key.fmt_indented(f, indent + 1)?;
                return value.fmt_indented(f, indent + 1);
            }
        }
        for step in &self.steps {
            let slot = match &step.target {
                TargetSlot::Param(i) => format!("param {i}"),
                TargetSlot::Setter(name) => format!("setter {name}"),
            };
            writeln!(
                f,
                "{pad}  #{} {} ({}) -> {slot} '{}' ({})",
                step.source_column,
                step.column_name,
                step.converter.source_type(),
                step.field,
                step.converter.target_type()
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for BindingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
