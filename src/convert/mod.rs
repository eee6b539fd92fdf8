//! Type converter registry.
//!
//! A converter turns a raw column [`Value`] of some [`ColumnType`] into the
//! representation of a host [`TargetType`]. Converters are looked up once,
//! while a binding plan is built, and applied to every row afterwards.
//!
//! The process-wide registry is installed once during startup through
//! [`install_global`]; after that it is only read, so lookups take no locks.

mod builtin;
mod coerce;
mod registry;

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, RowbindError};
use crate::types::{ColumnType, Value};

pub use coerce::coerce_to_column;
pub use registry::ConverterRegistry;

/// Host-side type a column value is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// `bool`.
    Bool,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `f32`.
    F32,
    /// `f64`.
    F64,
    /// `String`.
    String,
    /// `chrono::DateTime<Utc>`.
    Timestamp,
    /// `chrono::NaiveDate`.
    Date,
    /// `uuid::Uuid`.
    Uuid,
    /// Owned bytes.
    Bytes,
    /// The raw [`Value`], unconverted.
    Value,
    /// Nullable wrapper; null maps to the absent value.
    Option(Box<TargetType>),
    /// Ordered collection.
    List(Box<TargetType>),
    /// Collection of distinct elements.
    Set(Box<TargetType>),
    /// Key-value collection.
    Map(Box<TargetType>, Box<TargetType>),
    /// Application type served by a registered custom converter.
    Custom(String),
}

impl TargetType {
    /// Shorthand for `option<inner>`.
    #[must_use]
    pub fn option(inner: TargetType) -> Self {
        TargetType::Option(Box::new(inner))
    }

    /// Shorthand for `list<element>`.
    #[must_use]
    pub fn list(element: TargetType) -> Self {
        TargetType::List(Box::new(element))
    }

    /// Shorthand for `set<element>`.
    #[must_use]
    pub fn set(element: TargetType) -> Self {
        TargetType::Set(Box::new(element))
    }

    /// Shorthand for `map<key, value>`.
    #[must_use]
    pub fn map(key: TargetType, value: TargetType) -> Self {
        TargetType::Map(Box::new(key), Box::new(value))
    }

    /// Returns true if a null column value is acceptable for this type.
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        matches!(self, TargetType::Option(_) | TargetType::Value)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Bool => f.write_str("bool"),
            TargetType::I16 => f.write_str("i16"),
            TargetType::I32 => f.write_str("i32"),
            TargetType::I64 => f.write_str("i64"),
            TargetType::F32 => f.write_str("f32"),
            TargetType::F64 => f.write_str("f64"),
            TargetType::String => f.write_str("string"),
            TargetType::Timestamp => f.write_str("timestamp"),
            TargetType::Date => f.write_str("date"),
            TargetType::Uuid => f.write_str("uuid"),
            TargetType::Bytes => f.write_str("bytes"),
            TargetType::Value => f.write_str("value"),
            TargetType::Option(t) => write!(f, "option<{t}>"),
            TargetType::List(t) => write!(f, "list<{t}>"),
            TargetType::Set(t) => write!(f, "set<{t}>"),
            TargetType::Map(k, v) => write!(f, "map<{k}, {v}>"),
            TargetType::Custom(name) => f.write_str(name),
        }
    }
}

/// Reason a single value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConvertFailure(pub String);

impl ConvertFailure {
    /// The value's variant does not match what the converter reads.
    #[must_use]
    pub fn unexpected(expected: &str, found: &Value) -> Self {
        ConvertFailure(format!("expected {expected}, found {}", found.type_name()))
    }
}

/// Result of applying a converter to one value.
pub type ConvertResult = std::result::Result<Value, ConvertFailure>;

/// A stateless value conversion.
pub trait Converter: Send + Sync {
    /// Converts one non-null value.
    ///
    /// # Errors
    ///
    /// Returns a failure when the value is malformed for this conversion.
    fn convert(&self, value: &Value) -> ConvertResult;
}

impl<F> Converter for F
where
    F: Fn(&Value) -> ConvertResult + Send + Sync,
{
    fn convert(&self, value: &Value) -> ConvertResult {
        self(value)
    }
}

/// A resolved converter together with the conversion it performs.
///
/// Two refs compare equal when they convert between the same types, which
/// keeps binding plans structurally comparable.
#[derive(Clone)]
pub struct ConverterRef {
    source_type: ColumnType,
    target_type: TargetType,
    func: Arc<dyn Converter>,
}

impl ConverterRef {
    /// Wraps a converter function.
    #[must_use]
    pub fn new(source_type: ColumnType, target_type: TargetType, func: Arc<dyn Converter>) -> Self {
        ConverterRef {
            source_type,
            target_type,
            func,
        }
    }

    /// Column type this converter reads.
    #[must_use]
    pub fn source_type(&self) -> &ColumnType {
        &self.source_type
    }

    /// Host type this converter produces.
    #[must_use]
    pub fn target_type(&self) -> &TargetType {
        &self.target_type
    }

    /// Applies the conversion. Nulls are rejected unless the target accepts them.
    ///
    /// # Errors
    ///
    /// Returns a failure for nulls in non-optional targets and for malformed values.
    pub fn convert(&self, value: &Value) -> ConvertResult {
        if value.is_null() && !self.target_type.accepts_null() {
            return Err(ConvertFailure(format!(
                "null value for non-optional {}",
                self.target_type
            )));
        }
        self.func.convert(value)
    }
}

impl PartialEq for ConverterRef {
    fn eq(&self, other: &Self) -> bool {
        self.source_type == other.source_type && self.target_type == other.target_type
    }
}

impl Eq for ConverterRef {}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterRef({} -> {})", self.source_type, self.target_type)
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<ConverterRegistry>> = OnceLock::new();

/// Installs the process-wide registry. Call once during startup, before any
/// query resolves a plan.
///
/// # Errors
///
/// Returns an error if a registry is already installed, including the
/// built-in default created by an earlier [`global`] call.
pub fn install_global(registry: ConverterRegistry) -> Result<Arc<ConverterRegistry>> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY.set(Arc::clone(&registry)).map_err(|_| {
        RowbindError::RegistryError("Global converter registry is already installed".into())
    })?;
    tracing::debug!(
        custom_converters = registry.custom_count(),
        "installed global converter registry"
    );
    Ok(registry)
}

/// Returns the process-wide registry, installing the built-in one if none was set.
#[must_use]
pub fn global() -> Arc<ConverterRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(ConverterRegistry::new())))
}
