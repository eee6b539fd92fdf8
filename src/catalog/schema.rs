//! Column metadata for query results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RowbindError};
use crate::types::{ColumnType, Row};

/// Role a column plays in its table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Part of the partition key, at the given position.
    PartitionKey(usize),
    /// Clustering column, at the given position.
    Clustering(usize),
    /// Ordinary column.
    #[default]
    Regular,
    /// Column shared by all rows of a partition.
    Static,
}

impl ColumnRole {
    /// Returns whether the column belongs to the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        matches!(self, ColumnRole::PartitionKey(_) | ColumnRole::Clustering(_))
    }
}

/// Definition of a single result column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name, as the database spells it.
    pub name: String,
    /// Column type tag.
    pub column_type: ColumnType,
    /// Whether the column may hold nulls.
    pub nullable: bool,
    /// Primary key role.
    pub role: ColumnRole,
}

impl ColumnDef {
    /// Creates a nullable regular column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column name is empty.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RowbindError::SchemaError("Column name cannot be empty".into()));
        }
        Ok(ColumnDef {
            name,
            column_type,
            nullable: true,
            role: ColumnRole::Regular,
        })
    }

    /// Marks the column as non-nullable.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as a partition key column at `position`.
    #[must_use]
    pub fn partition_key(mut self, position: usize) -> Self {
        self.role = ColumnRole::PartitionKey(position);
        self.nullable = false;
        self
    }

    /// Marks the column as a clustering column at `position`.
    #[must_use]
    pub fn clustering(mut self, position: usize) -> Self {
        self.role = ColumnRole::Clustering(position);
        self.nullable = false;
        self
    }

    /// Marks the column as static.
    #[must_use]
    pub fn static_column(mut self) -> Self {
        self.role = ColumnRole::Static;
        self
    }
}

/// Ordered column metadata of a query result.
///
/// Produced once per result and shared read-only by every row of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMetadata {
    columns: Vec<ColumnDef>,
}

impl ColumnMetadata {
    /// Creates validated column metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (no columns, duplicate names,
    /// duplicate or non-contiguous key positions).
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let metadata = ColumnMetadata { columns };
        metadata.validate()?;
        Ok(metadata)
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(RowbindError::SchemaError(
                "Result must have at least one column".into(),
            ));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(RowbindError::SchemaError(format!(
                    "Duplicate column name '{}'",
                    col.name
                )));
            }
        }

        Self::check_positions(
            "partition key",
            self.columns.iter().filter_map(|c| match c.role {
                ColumnRole::PartitionKey(p) => Some(p),
                _ => None,
            }),
        )?;
        Self::check_positions(
            "clustering",
            self.columns.iter().filter_map(|c| match c.role {
                ColumnRole::Clustering(p) => Some(p),
                _ => None,
            }),
        )?;

        Ok(())
    }

    /// Key positions must form `0..n` without gaps or repeats.
    fn check_positions(kind: &str, positions: impl Iterator<Item = usize>) -> Result<()> {
        let mut positions: Vec<usize> = positions.collect();
        positions.sort_unstable();
        for (expected, actual) in positions.iter().enumerate() {
            if expected != *actual {
                return Err(RowbindError::SchemaError(format!(
                    "Invalid {kind} positions {positions:?}: expected 0..{}",
                    positions.len()
                )));
            }
        }
        Ok(())
    }

    /// Returns the column definitions in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for validated metadata; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a column by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    /// Finds a column definition by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Finds the index of a column by name.
    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns column names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the indices of the partition key columns, in key order.
    #[must_use]
    pub fn partition_key(&self) -> Vec<usize> {
        self.key_indices(|role| match role {
            ColumnRole::PartitionKey(p) => Some(p),
            _ => None,
        })
    }

    /// Returns the indices of the clustering columns, in key order.
    #[must_use]
    pub fn clustering_columns(&self) -> Vec<usize> {
        self.key_indices(|role| match role {
            ColumnRole::Clustering(p) => Some(p),
            _ => None,
        })
    }

    /// Returns the indices of the primary key columns: partition key first,
    /// then clustering columns.
    #[must_use]
    pub fn primary_key(&self) -> Vec<usize> {
        let mut key = self.partition_key();
        key.extend(self.clustering_columns());
        key
    }

    fn key_indices(&self, position: impl Fn(ColumnRole) -> Option<usize>) -> Vec<usize> {
        let mut keyed: Vec<(usize, usize)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| position(c.role).map(|p| (p, idx)))
            .collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Projects the metadata onto the named columns, in the given order.
    ///
    /// This is the shape a `select(...)` projection hands to the binder.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is unknown or repeated.
    pub fn select(&self, names: &[&str]) -> Result<Selection> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = self.get_column_index(name).ok_or_else(|| {
                RowbindError::SchemaError(format!("Selected column '{name}' does not exist"))
            })?;
            indices.push(idx);
        }
        // A key survives projection only if all of its columns were selected.
        let keep_partition = self.partition_key().iter().all(|i| indices.contains(i));
        let keep_clustering = self.clustering_columns().iter().all(|i| indices.contains(i));
        let projected = indices
            .iter()
            .map(|&i| {
                let mut def = self.columns[i].clone();
                match def.role {
                    ColumnRole::PartitionKey(_) if !keep_partition => def.role = ColumnRole::Regular,
                    ColumnRole::Clustering(_) if !keep_clustering => def.role = ColumnRole::Regular,
                    _ => {}
                }
                def
            })
            .collect();
        let columns = ColumnMetadata::new(projected)?;
        Ok(Selection { columns, indices })
    }

    /// Serializes the metadata to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| RowbindError::CatalogError(format!("Failed to serialize columns: {e}")))
    }

    /// Deserializes metadata from bytes, re-validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization or validation fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let metadata: ColumnMetadata = bincode::deserialize(data)
            .map_err(|e| RowbindError::CatalogError(format!("Failed to deserialize columns: {e}")))?;
        metadata.validate()?;
        Ok(metadata)
    }
}

/// A projection of full-width rows onto selected columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Metadata of the projected columns.
    pub columns: ColumnMetadata,
    /// Source index of each projected column.
    pub indices: Vec<usize>,
}

impl Selection {
    /// Projects a full-width row. Missing source values become nulls.
    #[must_use]
    pub fn project(&self, row: &Row) -> Row {
        self.indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(crate::types::Value::Null))
            .collect()
    }
}
