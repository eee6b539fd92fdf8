//! Lazy row-at-a-time materialization.

use std::sync::Arc;

use futures::stream::{Stream, StreamExt};

use crate::binder::BindingPlan;
use crate::error::ConversionError;
use crate::types::Row;

use super::{materialize, Instance};

/// Iterator adapter materializing each row as it is pulled.
///
/// Dropping the iterator stops materialization; no work is done ahead.
#[derive(Debug)]
pub struct MaterializeIter<I> {
    plan: Arc<BindingPlan>,
    rows: I,
}

impl<I> MaterializeIter<I>
where
    I: Iterator<Item = Row>,
{
    /// Wraps `rows` so each one is materialized against `plan`.
    pub fn new(plan: Arc<BindingPlan>, rows: I) -> Self {
        MaterializeIter { plan, rows }
    }

    /// Returns the plan being applied.
    #[must_use]
    pub fn plan(&self) -> &Arc<BindingPlan> {
        &self.plan
    }
}

impl<I> Iterator for MaterializeIter<I>
where
    I: Iterator<Item = Row>,
{
    type Item = Result<Instance, ConversionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(materialize(&self.plan, &row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// Maps a stream of rows to a stream of materialized instances.
pub fn materialize_stream<S>(
    plan: Arc<BindingPlan>,
    rows: S,
) -> impl Stream<Item = Result<Instance, ConversionError>>
where
    S: Stream<Item = Row>,
{
    rows.map(move |row| materialize(&plan, &row))
}
