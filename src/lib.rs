//! rowbind - column-to-object binding engine
//!
//! Maps database result rows onto host-language targets: positional tuples,
//! named records built through constructors and setters, and key-value pairs
//! split along the table's primary key.
//!
//! Work happens in two phases. A target descriptor is first resolved against
//! the result's column metadata into a [`BindingPlan`]; this is where column
//! names are matched and converters are chosen, and where every structural
//! error surfaces. The plan is then applied to each raw row, cheaply and from
//! any number of threads.
//!
//! ```
//! use rowbind::{ColumnDef, ColumnMetadata, ColumnType, RowMapper, Row, Value};
//!
//! let columns = ColumnMetadata::new(vec![
//!     ColumnDef::new("word", ColumnType::Text)?,
//!     ColumnDef::new("count", ColumnType::Int)?,
//! ])?;
//! let mapper = RowMapper::default();
//! let plan = mapper.bind::<(String, i64)>(&columns)?;
//! let row = Row::new(vec![Value::Text("bar".into()), Value::Int(20)]);
//! assert_eq!(plan.materialize(&row)?, ("bar".to_string(), 20));
//! # Ok::<(), rowbind::RowbindError>(())
//! ```

pub mod binder;
pub mod catalog;
pub mod convert;
pub mod error;
pub mod mapping;
pub mod materializer;
pub mod naming;
pub mod types;

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

pub use binder::{
    BindingPlan, CacheStats, RecordShape, ShapeResolver, TargetDescriptor, TupleShape, WritePlan,
};
pub use catalog::{ColumnDef, ColumnMetadata, ColumnRole};
pub use convert::{ConverterRegistry, TargetType};
pub use error::{ConversionError, ResolutionError, Result, RowbindError};
pub use mapping::{Blob, FromValue, IntoRecord, IntoValue, KeyValue, MappedRows, RowType, TypedPlan};
pub use materializer::{materialize, ErrorPolicy, Instance, RecordInstance};
pub use types::{ColumnType, Row, Value};

use binder::PlanCache;

/// Default number of cached binding plans.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 256;

/// Default batch size at which materialization goes parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// Configuration for a [`RowMapper`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Maximum number of cached plans (0 = no caching).
    pub plan_cache_capacity: usize,
    /// Batches at or above this many rows are materialized in parallel.
    pub parallel_threshold: usize,
    /// How row sequences react to per-row failures.
    pub error_policy: ErrorPolicy,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl MapperConfig {
    /// Creates a new mapper configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plan cache capacity.
    #[must_use]
    pub fn with_plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.plan_cache_capacity = capacity;
        self
    }

    /// Sets the parallel materialization threshold.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

/// Entry point tying the resolver, plan cache and materializer together.
///
/// One mapper is typically shared by every query of a session.
#[derive(Debug)]
pub struct RowMapper {
    config: MapperConfig,
    resolver: ShapeResolver,
    cache: PlanCache,
}

impl Default for RowMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl RowMapper {
    /// Creates a mapper using the process-wide converter registry.
    #[must_use]
    pub fn new(config: MapperConfig) -> Self {
        Self::with_registry(config, convert::global())
    }

    /// Creates a mapper using `registry`.
    #[must_use]
    pub fn with_registry(config: MapperConfig, registry: Arc<ConverterRegistry>) -> Self {
        let cache = PlanCache::new(config.plan_cache_capacity);
        Self {
            config,
            resolver: ShapeResolver::new(registry),
            cache,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Resolves (or fetches from cache) the plan for `target` over `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`RowbindError::Resolution`] when the target cannot be bound.
    pub fn resolve(
        &self,
        columns: &ColumnMetadata,
        target: &TargetDescriptor,
    ) -> Result<Arc<BindingPlan>> {
        Ok(self.cache.get_or_resolve(columns, target, &self.resolver)?)
    }

    /// Resolves the plan for row type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RowbindError::Resolution`] when `T` cannot be bound.
    pub fn bind<T: RowType>(&self, columns: &ColumnMetadata) -> Result<TypedPlan<T>> {
        let plan = self.resolve(columns, &T::descriptor())?;
        Ok(TypedPlan::new(plan))
    }

    /// Maps a row sequence into `T` under the configured error policy.
    ///
    /// # Errors
    ///
    /// Returns resolution errors, and the first row failure under `FailFast`.
    pub fn map_rows<T, I>(&self, columns: &ColumnMetadata, rows: I) -> Result<MappedRows<T>>
    where
        T: RowType,
        I: IntoIterator<Item = Row>,
    {
        self.bind::<T>(columns)?.collect(rows, self.config.error_policy)
    }

    /// Maps a slice of rows into `T`, in parallel above the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns resolution errors, and the first row failure under `FailFast`.
    pub fn map_batch<T: RowType>(
        &self,
        columns: &ColumnMetadata,
        rows: &[Row],
    ) -> Result<MappedRows<T>> {
        let plan = self.bind::<T>(columns)?;
        let results = plan.materialize_batch(rows, self.config.parallel_threshold);
        MappedRows::gather(results, self.config.error_policy)
    }

    /// Maps every record of an Arrow batch into `T`.
    ///
    /// # Errors
    ///
    /// Returns schema errors for unsupported Arrow types, plus everything
    /// [`RowMapper::map_batch`] returns.
    pub fn map_record_batch<T: RowType>(&self, batch: &RecordBatch) -> Result<MappedRows<T>> {
        let columns = ColumnMetadata::from_arrow_schema(batch.schema().as_ref())?;
        let rows = catalog::rows_from_record_batch(&columns, batch)?;
        self.map_batch(&columns, &rows)
    }

    /// Resolves the write plan for records of type `T` into `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`RowbindError::Resolution`] when a key column is not covered.
    pub fn write_plan<T: IntoRecord>(&self, columns: &ColumnMetadata) -> Result<WritePlan> {
        Ok(binder::resolve_write(columns, &T::record_shape())?)
    }

    /// Converts records into rows for `columns`, returning the written
    /// column names alongside.
    ///
    /// # Errors
    ///
    /// Returns resolution errors and the first record that fails coercion.
    pub fn to_rows<T, I>(
        &self,
        columns: &ColumnMetadata,
        records: I,
    ) -> Result<(Vec<String>, Vec<Row>)>
    where
        T: IntoRecord,
        I: IntoIterator<Item = T>,
    {
        let plan = self.write_plan::<T>(columns)?;
        let rows = records
            .into_iter()
            .map(|record| plan.to_row(&record.into_record()).map_err(RowbindError::from))
            .collect::<Result<Vec<_>>>()?;
        let names = plan.columns().into_iter().map(String::from).collect();
        Ok((names, rows))
    }

    /// Returns plan cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached plan.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
