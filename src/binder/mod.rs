//! Binder module for target shape resolution.
//!
//! The binder matches a target descriptor against result column metadata,
//! resolving:
//! - Record fields to columns by alias, exact name, or camelCase form
//! - Tuple elements to columns by position
//! - Pair sides to disjoint column subsets keyed by the primary key
//! - Every column/field pair to a converter
//!
//! The output is a binding plan ready for materialization.

mod cache;
mod descriptor;
mod matcher;
mod pair;
mod plan;
mod resolver;
mod write;

pub use cache::{CacheStats, PlanCache};
pub use descriptor::{FieldDescriptor, RecordShape, TargetDescriptor, TupleShape};
pub use pair::{decompose, ColumnPartition};
pub use plan::{BindingPlan, BindingStep, PlanShape, TargetSlot};
pub use resolver::ShapeResolver;
pub use write::{resolve_write, WritePlan, WriteStep};
