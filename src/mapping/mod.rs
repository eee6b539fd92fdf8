//! Typed mapping layer.
//!
//! Compile-time descriptions of host types: [`FromValue`] and [`IntoValue`]
//! for field types, [`RowType`] for whole row targets, [`IntoRecord`] for
//! records written back to tables. [`TypedPlan`] pairs a resolved plan with
//! the row type it produces.

mod row_type;
mod typed;
mod value;

use crate::binder::{RecordShape, TargetDescriptor};
use crate::convert::{ConvertFailure, TargetType};
use crate::error::Result;
use crate::materializer::{Instance, RecordInstance};
use crate::types::Value;

pub use row_type::KeyValue;
pub use typed::{MappedRows, TypedPlan};
pub use value::Blob;

/// A host type that can be read out of a converted column value.
pub trait FromValue: Sized {
    /// The target type the converter registry must produce for `Self`.
    fn target_type() -> TargetType;

    /// Extracts `Self` from a converted value.
    ///
    /// # Errors
    ///
    /// Returns a failure when the value has the wrong variant.
    fn from_value(value: Value) -> std::result::Result<Self, ConvertFailure>;
}

/// A host type that can be turned into a column value.
pub trait IntoValue {
    /// Converts `self` into a value.
    fn into_value(self) -> Value;
}

/// A host type a whole row maps onto.
///
/// Implemented for tuples of one to eight [`FromValue`] elements and for
/// [`KeyValue`]. Records implement it by hand:
///
/// ```
/// use rowbind::{Instance, RecordShape, Result, RowType, TargetDescriptor};
///
/// struct WordCount {
///     word: String,
///     count: i64,
/// }
///
/// impl RowType for WordCount {
///     fn descriptor() -> TargetDescriptor {
///         RecordShape::new("WordCount")
///             .param::<String>("word")
///             .param::<i64>("count")
///             .into()
///     }
///
///     fn from_instance(instance: Instance) -> Result<Self> {
///         let mut record = instance.into_record()?;
///         Ok(WordCount {
///             word: record.take_arg(0)?,
///             count: record.take_arg(1)?,
///         })
///     }
/// }
/// ```
pub trait RowType: Sized {
    /// Describes the target shape.
    fn descriptor() -> TargetDescriptor;

    /// Builds `Self` from an instance materialized against [`Self::descriptor`].
    ///
    /// # Errors
    ///
    /// Returns an extraction error when the instance does not fit.
    fn from_instance(instance: Instance) -> Result<Self>;
}

/// A record type that can be written back to a table.
pub trait IntoRecord {
    /// Describes the record's fields.
    fn record_shape() -> RecordShape;

    /// Converts `self` into a record instance laid out like [`Self::record_shape`].
    fn into_record(self) -> RecordInstance;
}
