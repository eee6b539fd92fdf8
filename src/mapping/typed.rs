//! Plans bound to a host row type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{Stream, StreamExt};

use crate::binder::BindingPlan;
use crate::error::{Result, RowbindError};
use crate::materializer::{self, ErrorPolicy, MaterializeIter};
use crate::types::Row;

use super::RowType;

/// A resolved plan producing values of `T`.
pub struct TypedPlan<T> {
    plan: Arc<BindingPlan>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedPlan<T> {
    fn clone(&self) -> Self {
        TypedPlan {
            plan: Arc::clone(&self.plan),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPlan")
            .field("target", &std::any::type_name::<T>())
            .field("plan", &self.plan)
            .finish()
    }
}

impl<T: RowType> TypedPlan<T> {
    /// Wraps a plan resolved against `T::descriptor()`.
    #[must_use]
    pub fn new(plan: Arc<BindingPlan>) -> Self {
        TypedPlan {
            plan,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying plan.
    #[must_use]
    pub fn plan(&self) -> &Arc<BindingPlan> {
        &self.plan
    }

    /// Materializes one row into `T`.
    ///
    /// # Errors
    ///
    /// Returns a conversion error for malformed values, or an extraction
    /// error if the instance does not fit `T`.
    pub fn materialize(&self, row: &Row) -> Result<T> {
        let instance = materializer::materialize(&self.plan, row)?;
        T::from_instance(instance)
    }

    /// Materializes a batch, in parallel at or above `threshold` rows.
    pub fn materialize_batch(&self, rows: &[Row], threshold: usize) -> Vec<Result<T>> {
        materializer::materialize_batch(&self.plan, rows, threshold)
            .into_iter()
            .map(|res| res.map_err(RowbindError::from).and_then(T::from_instance))
            .collect()
    }

    /// Lazily materializes `rows`.
    pub fn iter<I>(&self, rows: I) -> impl Iterator<Item = Result<T>>
    where
        I: IntoIterator<Item = Row>,
    {
        MaterializeIter::new(Arc::clone(&self.plan), rows.into_iter())
            .map(|res| res.map_err(RowbindError::from).and_then(T::from_instance))
    }

    /// Maps a stream of rows into a stream of `T`.
    pub fn stream<S>(&self, rows: S) -> impl Stream<Item = Result<T>>
    where
        S: Stream<Item = Row>,
    {
        materializer::materialize_stream(Arc::clone(&self.plan), rows)
            .map(|res| res.map_err(RowbindError::from).and_then(T::from_instance))
    }

    /// Materializes every row, handling failures according to `policy`.
    ///
    /// # Errors
    ///
    /// With [`ErrorPolicy::FailFast`], returns the first row failure.
    pub fn collect<I>(&self, rows: I, policy: ErrorPolicy) -> Result<MappedRows<T>>
    where
        I: IntoIterator<Item = Row>,
    {
        MappedRows::gather(self.iter(rows), policy)
    }
}

/// Outcome of mapping a row sequence under an [`ErrorPolicy`].
#[derive(Debug)]
pub struct MappedRows<T> {
    /// Successfully mapped rows, in input order.
    pub rows: Vec<T>,
    /// Failures with their input row index. Only filled under `Collect`.
    pub errors: Vec<(usize, RowbindError)>,
    /// Number of rows dropped under `Skip`.
    pub skipped: usize,
}

impl<T> MappedRows<T> {
    pub(crate) fn gather<I>(results: I, policy: ErrorPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = Result<T>>,
    {
        let mut out = MappedRows {
            rows: Vec::new(),
            errors: Vec::new(),
            skipped: 0,
        };

        for (index, res) in results.into_iter().enumerate() {
            match (res, policy) {
                (Ok(value), _) => out.rows.push(value),
                (Err(e), ErrorPolicy::FailFast) => return Err(e),
                (Err(e), ErrorPolicy::Skip) => {
                    tracing::warn!(row = index, error = %e, "skipping row");
                    out.skipped += 1;
                }
                (Err(e), ErrorPolicy::Collect) => out.errors.push((index, e)),
            }
        }
        Ok(out)
    }

    /// Returns true if no row failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.skipped == 0
    }
}
