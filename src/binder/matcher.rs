//! Field-to-column matching over a subset of result columns.

use crate::catalog::ColumnMetadata;
use crate::error::ResolutionError;
use crate::naming::{self, CandidateSet, MatchKind};

use super::descriptor::{FieldDescriptor, RecordShape};

/// Matches record fields against columns, memoizing each column's
/// candidate spellings.
pub(crate) struct ColumnMatcher<'a> {
    columns: &'a ColumnMetadata,
    candidates: Vec<(usize, CandidateSet)>,
    /// Columns some field names exactly or by alias; closed to camelCase matches.
    reserved: Vec<usize>,
}

impl<'a> ColumnMatcher<'a> {
    /// Prepares a matcher over the columns at `indices`.
    pub(crate) fn new(columns: &'a ColumnMetadata, indices: &[usize]) -> Self {
        let candidates = indices
            .iter()
            .filter_map(|&i| columns.get(i).map(|c| (i, naming::candidates(&c.name))))
            .collect();
        ColumnMatcher {
            columns,
            candidates,
            reserved: Vec::new(),
        }
    }

    /// Prepares a matcher for the fields of `shape`.
    ///
    /// A column named exactly by one field cannot also feed another field
    /// through its camelCase spelling.
    pub(crate) fn for_record(
        columns: &'a ColumnMetadata,
        indices: &[usize],
        shape: &RecordShape,
    ) -> Self {
        let mut matcher = Self::new(columns, indices);
        let reserved = shape
            .constructor_params
            .iter()
            .chain(shape.effective_setters())
            .filter_map(|field| matcher.named(field))
            .collect();
        matcher.reserved = reserved;
        matcher
    }

    /// The column a field names literally, by alias or by its own name.
    fn named(&self, field: &FieldDescriptor) -> Option<usize> {
        let name = field.column.as_deref().unwrap_or(&field.name);
        self.candidates
            .iter()
            .find(|(_, set)| set.exact() == name)
            .map(|(i, _)| *i)
    }

    /// Finds the column feeding `field`.
    ///
    /// An explicit alias must name a column exactly. Otherwise an exact name
    /// match wins over camelCase matches, and more than one camelCase match
    /// is ambiguous. Reserved columns never match by camelCase.
    pub(crate) fn find(&self, field: &FieldDescriptor) -> Result<Option<usize>, ResolutionError> {
        if field.column.is_some() {
            return Ok(self.named(field));
        }

        let mut camel = Vec::new();
        for (idx, set) in &self.candidates {
            match set.matches(&field.name) {
                Some(MatchKind::Exact) => return Ok(Some(*idx)),
                Some(MatchKind::CamelCase) if !self.reserved.contains(idx) => camel.push(*idx),
                _ => {}
            }
        }

        match camel.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => Err(ResolutionError::AmbiguousColumn {
                field: field.name.clone(),
                candidates: many.iter().map(|&i| self.name(i).to_string()).collect(),
            }),
        }
    }

    /// Finds the column for a required field.
    pub(crate) fn require(
        &self,
        target: &str,
        field: &FieldDescriptor,
    ) -> Result<usize, ResolutionError> {
        self.find(field)?
            .ok_or_else(|| ResolutionError::MissingColumn {
                target: target.to_string(),
                field: field.column.clone().unwrap_or_else(|| field.name.clone()),
                available: self.available(),
            })
    }

    /// Names of the columns this matcher searches.
    pub(crate) fn available(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|(_, set)| set.exact().to_string())
            .collect()
    }

    fn name(&self, idx: usize) -> &str {
        self.columns.get(idx).map_or("", |c| c.name.as_str())
    }
}
