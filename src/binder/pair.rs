//! Key/value column partitioning for pair targets.

use crate::catalog::ColumnMetadata;
use crate::error::ResolutionError;

use super::descriptor::{RecordShape, TargetDescriptor};
use super::matcher::ColumnMatcher;

/// Column indices assigned to each side of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPartition {
    /// Columns feeding the key, in binding order.
    pub key: Vec<usize>,
    /// Columns feeding the value, in binding order.
    pub value: Vec<usize>,
}

/// Splits `columns` between the key and value sides of a pair.
///
/// The key side is assigned first. A record key claims the columns its fields
/// match, searched across all columns; a tuple key takes the primary key in
/// key order. The value side only sees the columns the key did not claim: a
/// record value claims the ones its fields match, a tuple value takes all of
/// them in declaration order. The two sides never share a column.
///
/// # Errors
///
/// Returns [`ResolutionError::MissingPrimaryKey`] for a tuple key over
/// columns without a primary key, [`ResolutionError::InvalidDescriptor`] for
/// nested pairs, and any matching error raised by a record side.
pub fn decompose(
    columns: &ColumnMetadata,
    key: &TargetDescriptor,
    value: &TargetDescriptor,
) -> Result<ColumnPartition, ResolutionError> {
    let all: Vec<usize> = (0..columns.len()).collect();

    let key_cols = match key {
        TargetDescriptor::Record(shape) => claim(columns, &all, shape)?,
        TargetDescriptor::Tuple(_) => {
            let pk = columns.primary_key();
            if pk.is_empty() {
                return Err(ResolutionError::MissingPrimaryKey {
                    target: key.to_string(),
                });
            }
            pk
        }
        TargetDescriptor::Pair(..) => return Err(nested(key)),
    };

    let rest: Vec<usize> = all
        .into_iter()
        .filter(|i| !key_cols.contains(i))
        .collect();
    let value_cols = match value {
        TargetDescriptor::Record(shape) => claim(columns, &rest, shape)?,
        TargetDescriptor::Tuple(_) => rest,
        TargetDescriptor::Pair(..) => return Err(nested(value)),
    };

    Ok(ColumnPartition {
        key: key_cols,
        value: value_cols,
    })
}

/// Columns a record matches: constructor params first, then setters.
/// Unmatched params are left for the resolver to report.
fn claim(
    columns: &ColumnMetadata,
    indices: &[usize],
    shape: &RecordShape,
) -> Result<Vec<usize>, ResolutionError> {
    let matcher = ColumnMatcher::for_record(columns, indices, shape);
    let mut claimed = Vec::new();
    for field in shape
        .constructor_params
        .iter()
        .chain(shape.effective_setters())
    {
        if let Some(idx) = matcher.find(field)? {
            if !claimed.contains(&idx) {
                claimed.push(idx);
            }
        }
    }
    Ok(claimed)
}

fn nested(desc: &TargetDescriptor) -> ResolutionError {
    ResolutionError::InvalidDescriptor(format!("pair side {desc} cannot itself be a pair"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::descriptor::TupleShape;
    use crate::catalog::ColumnDef;
    use crate::convert::TargetType;
    use crate::types::ColumnType;

    fn users() -> ColumnMetadata {
        ColumnMetadata::new(vec![
            ColumnDef::new("user_name", ColumnType::Text).unwrap().clustering(0),
            ColumnDef::new("domain", ColumnType::Text).unwrap().partition_key(0),
            ColumnDef::new("password_hash", ColumnType::Text).unwrap(),
            ColumnDef::new("last_visit", ColumnType::Timestamp).unwrap(),
        ])
        .unwrap()
    }

    fn key_tuple() -> TargetDescriptor {
        TupleShape::new(vec![TargetType::String, TargetType::String]).into()
    }

    #[test]
    fn test_tuple_key_takes_primary_key_order() {
        let value = RecordShape::new("UserData")
            .param::<String>("passwordHash")
            .param::<i64>("lastVisit");
        let part = decompose(&users(), &key_tuple(), &value.into()).unwrap();
        assert_eq!(part.key, vec![1, 0]);
        assert_eq!(part.value, vec![2, 3]);
    }

    #[test]
    fn test_tuple_value_takes_remaining_columns() {
        let part = decompose(
            &users(),
            &key_tuple(),
            &TupleShape::new(vec![TargetType::String, TargetType::Timestamp]).into(),
        )
        .unwrap();
        assert_eq!(part.value, vec![2, 3]);
    }

    #[test]
    fn test_record_key_claims_named_columns() {
        let key = RecordShape::new("UserKey")
            .param::<String>("domain")
            .param::<String>("userName");
        let part = decompose(
            &users(),
            &key.into(),
            &TupleShape::new(vec![TargetType::String, TargetType::Timestamp]).into(),
        )
        .unwrap();
        assert_eq!(part.key, vec![1, 0]);
        assert_eq!(part.value, vec![2, 3]);
    }

    #[test]
    fn test_record_value_skips_key_columns() {
        let key = RecordShape::new("UserKey")
            .param::<String>("domain")
            .param::<String>("userName");
        let value = RecordShape::new("UserData")
            .param::<String>("passwordHash")
            .setter::<String>("domain");
        let part = decompose(&users(), &key.into(), &value.into()).unwrap();
        assert_eq!(part.key, vec![1, 0]);
        assert_eq!(part.value, vec![2]);
        assert!(part.value.iter().all(|i| !part.key.contains(i)));
    }

    #[test]
    fn test_tuple_key_without_primary_key() {
        let cols = ColumnMetadata::new(vec![ColumnDef::new("a", ColumnType::Int).unwrap()]).unwrap();
        let key: TargetDescriptor = TupleShape::new(vec![TargetType::I32]).into();
        let err = decompose(&cols, &key, &key).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_nested_pair_rejected() {
        let inner = TargetDescriptor::pair(key_tuple(), key_tuple());
        let err = decompose(&users(), &inner, &key_tuple()).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidDescriptor(_)));
    }
}
