//! Error types for rowbind operations.

use thiserror::Error;

use crate::convert::TargetType;
use crate::types::ColumnType;

/// Result type alias using [`RowbindError`].
pub type Result<T> = std::result::Result<T, RowbindError>;

/// Error types for rowbind operations.
#[derive(Debug, Error)]
pub enum RowbindError {
    /// Column metadata failed validation, or an external schema could not be mapped.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Column metadata (de)serialization failure.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// Converter registry setup errors.
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// A target shape cannot be satisfied by the available columns.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A single row could not be converted into its target.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A materialized instance did not have the shape the typed layer expected.
    #[error("Extraction error: {0}")]
    ExtractionError(String),
}

/// Errors raised while resolving a target shape against column metadata.
///
/// These are fatal for the query: they surface before any row is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A required field has no matching column.
    #[error("Missing column for field '{field}' of {target} (available columns: {})", available.join(", "))]
    MissingColumn {
        target: String,
        field: String,
        available: Vec<String>,
    },

    /// More than one column matches a field by camelCase conversion.
    #[error("Ambiguous columns for field '{field}': {}", candidates.join(", "))]
    AmbiguousColumn {
        field: String,
        candidates: Vec<String>,
    },

    /// Projected column count differs from the tuple arity.
    #[error("Arity mismatch: tuple of {expected} elements, {actual} columns selected")]
    ArityMismatch { expected: usize, actual: usize },

    /// No converter exists between the column type and the field type.
    #[error("No converter from column '{column}' ({source_type}) to {target_type}")]
    NoConverter {
        column: String,
        source_type: ColumnType,
        target_type: TargetType,
    },

    /// A positional key shape needs the table's primary key, but none is declared.
    #[error("Key shape of {target} needs a primary key, but the columns declare none")]
    MissingPrimaryKey { target: String },

    /// A write target does not supply a value for a primary key column.
    #[error("Primary key column '{column}' is not supplied by {target}")]
    MissingKeyColumn { target: String, column: String },

    /// The descriptor itself is malformed.
    #[error("Invalid target descriptor: {0}")]
    InvalidDescriptor(String),
}

/// A per-row conversion failure.
///
/// Does not invalidate the binding plan; the caller decides whether to skip
/// the row, stop, or collect the failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot convert column '{column}' ({source_type}) into field '{field}' ({target_type}): {reason}")]
pub struct ConversionError {
    /// Column name in the result set.
    pub column: String,
    /// Target field name, or the element position for tuples.
    pub field: String,
    /// Declared column type.
    pub source_type: ColumnType,
    /// Requested host type.
    pub target_type: TargetType,
    /// What went wrong.
    pub reason: String,
}

/// Internal marker returned by the converter registry.
///
/// Always turned into [`ResolutionError::NoConverter`] before reaching callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no converter from {source_type} to {target_type}")]
pub struct ConverterNotFound {
    pub source_type: ColumnType,
    pub target_type: TargetType,
}

impl ConverterNotFound {
    /// Attaches the offending column name.
    #[must_use]
    pub fn for_column(self, column: &str) -> ResolutionError {
        ResolutionError::NoConverter {
            column: column.to_string(),
            source_type: self.source_type,
            target_type: self.target_type,
        }
    }
}
