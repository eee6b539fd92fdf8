//! Arrow schema and record batch ingestion.
//!
//! Columnar result sets are flattened into [`Row`]s so that they flow through
//! the same binding plans as row-oriented results.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType as ArrowType, Date32Type, Field, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Schema, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use uuid::Uuid;

use crate::error::{Result, RowbindError};
use crate::types::{ColumnType, Row, Value};

use super::{ColumnDef, ColumnMetadata};

const UUID_WIDTH: i32 = 16;
const SECONDS_PER_DAY: i64 = 86_400;

impl ColumnType {
    /// Converts to an Arrow data type.
    #[must_use]
    pub fn to_arrow(&self) -> ArrowType {
        match self {
            ColumnType::Boolean => ArrowType::Boolean,
            ColumnType::SmallInt => ArrowType::Int16,
            ColumnType::Int => ArrowType::Int32,
            ColumnType::BigInt => ArrowType::Int64,
            ColumnType::Float => ArrowType::Float32,
            ColumnType::Double => ArrowType::Float64,
            ColumnType::Text => ArrowType::Utf8,
            ColumnType::Timestamp => ArrowType::Timestamp(TimeUnit::Microsecond, None),
            ColumnType::Date => ArrowType::Date32,
            ColumnType::Uuid => ArrowType::FixedSizeBinary(UUID_WIDTH),
            ColumnType::Blob => ArrowType::Binary,
            ColumnType::List(e) | ColumnType::Set(e) => {
                ArrowType::List(Arc::new(Field::new("item", e.to_arrow(), true)))
            }
            ColumnType::Map(k, v) => ArrowType::Map(
                Arc::new(Field::new(
                    "entries",
                    ArrowType::Struct(
                        vec![
                            Field::new("key", k.to_arrow(), false),
                            Field::new("value", v.to_arrow(), true),
                        ]
                        .into(),
                    ),
                    false,
                )),
                false,
            ),
        }
    }

    /// Converts from an Arrow data type.
    ///
    /// Returns None for Arrow types with no column counterpart.
    #[must_use]
    pub fn from_arrow(arrow_type: &ArrowType) -> Option<Self> {
        match arrow_type {
            ArrowType::Boolean => Some(ColumnType::Boolean),
            ArrowType::Int16 => Some(ColumnType::SmallInt),
            ArrowType::Int32 => Some(ColumnType::Int),
            ArrowType::Int64 => Some(ColumnType::BigInt),
            ArrowType::Float32 => Some(ColumnType::Float),
            ArrowType::Float64 => Some(ColumnType::Double),
            ArrowType::Utf8 | ArrowType::LargeUtf8 => Some(ColumnType::Text),
            ArrowType::Date32 => Some(ColumnType::Date),
            ArrowType::Timestamp(TimeUnit::Millisecond | TimeUnit::Microsecond, _) => {
                Some(ColumnType::Timestamp)
            }
            ArrowType::FixedSizeBinary(UUID_WIDTH) => Some(ColumnType::Uuid),
            ArrowType::Binary | ArrowType::LargeBinary => Some(ColumnType::Blob),
            ArrowType::List(field) => Self::from_arrow(field.data_type()).map(ColumnType::list),
            _ => None,
        }
    }
}

impl ColumnMetadata {
    /// Builds column metadata from an Arrow schema.
    ///
    /// Arrow carries no key information, so every column is regular.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has an unsupported type or the resulting
    /// metadata fails validation.
    pub fn from_arrow_schema(schema: &Schema) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let column_type = ColumnType::from_arrow(field.data_type()).ok_or_else(|| {
                RowbindError::SchemaError(format!(
                    "Unsupported Arrow type {} for column '{}'",
                    field.data_type(),
                    field.name()
                ))
            })?;
            let mut def = ColumnDef::new(field.name().clone(), column_type)?;
            def.nullable = field.is_nullable();
            columns.push(def);
        }
        ColumnMetadata::new(columns)
    }
}

/// Flattens a record batch into rows aligned with `columns`.
///
/// # Errors
///
/// Returns an error if the batch width differs from the metadata, an array's
/// Arrow type does not decode as its column's type, or a value cannot be
/// decoded (for example a malformed UUID or out-of-range date).
pub fn rows_from_record_batch(columns: &ColumnMetadata, batch: &RecordBatch) -> Result<Vec<Row>> {
    if batch.num_columns() != columns.len() {
        return Err(RowbindError::SchemaError(format!(
            "Record batch has {} columns, metadata has {}",
            batch.num_columns(),
            columns.len()
        )));
    }

    let mut rows: Vec<Row> = (0..batch.num_rows())
        .map(|_| Row::new(Vec::with_capacity(columns.len())))
        .collect();

    for (col_idx, def) in columns.columns().iter().enumerate() {
        let array = batch.column(col_idx);
        if !decodes_as(array.data_type(), &def.column_type) {
            return Err(RowbindError::SchemaError(format!(
                "Column '{}' is {} but the batch holds Arrow {}",
                def.name,
                def.column_type,
                array.data_type()
            )));
        }
        for (row_idx, row) in rows.iter_mut().enumerate() {
            let value = value_at(array, &def.column_type, row_idx).map_err(|reason| {
                RowbindError::SchemaError(format!(
                    "Column '{}' row {row_idx}: {reason}",
                    def.name
                ))
            })?;
            row.push(value);
        }
    }

    Ok(rows)
}

/// Whether arrays of `arrow_type` decode as `column_type`. Arrow lists feed
/// both list and set columns.
fn decodes_as(arrow_type: &ArrowType, column_type: &ColumnType) -> bool {
    match (arrow_type, column_type) {
        (ArrowType::List(field), ColumnType::List(element) | ColumnType::Set(element)) => {
            decodes_as(field.data_type(), element)
        }
        _ => ColumnType::from_arrow(arrow_type).as_ref() == Some(column_type),
    }
}

/// Decodes the value at `row` of `array`, whose type `decodes_as` accepted.
fn value_at(array: &ArrayRef, column_type: &ColumnType, row: usize) -> std::result::Result<Value, String> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match column_type {
        ColumnType::Boolean => Value::Boolean(array.as_boolean().value(row)),
        ColumnType::SmallInt => Value::SmallInt(array.as_primitive::<Int16Type>().value(row)),
        ColumnType::Int => Value::Int(array.as_primitive::<Int32Type>().value(row)),
        ColumnType::BigInt => Value::BigInt(array.as_primitive::<Int64Type>().value(row)),
        ColumnType::Float => Value::Float(array.as_primitive::<Float32Type>().value(row)),
        ColumnType::Double => Value::Double(array.as_primitive::<Float64Type>().value(row)),
        ColumnType::Text => match array.data_type() {
            ArrowType::LargeUtf8 => Value::Text(array.as_string::<i64>().value(row).to_owned()),
            _ => Value::Text(array.as_string::<i32>().value(row).to_owned()),
        },
        ColumnType::Date => {
            let days = i64::from(array.as_primitive::<Date32Type>().value(row));
            let date = DateTime::from_timestamp(days * SECONDS_PER_DAY, 0)
                .ok_or_else(|| format!("date {days} days from epoch is out of range"))?
                .date_naive();
            Value::Date(date)
        }
        ColumnType::Timestamp => {
            let ts = match array.data_type() {
                ArrowType::Timestamp(TimeUnit::Millisecond, _) => DateTime::from_timestamp_millis(
                    array.as_primitive::<TimestampMillisecondType>().value(row),
                ),
                _ => DateTime::from_timestamp_micros(
                    array.as_primitive::<TimestampMicrosecondType>().value(row),
                ),
            };
            Value::Timestamp(ts.ok_or("timestamp out of range")?)
        }
        ColumnType::Uuid => {
            let bytes = array.as_fixed_size_binary().value(row);
            Value::Uuid(Uuid::from_slice(bytes).map_err(|e| e.to_string())?)
        }
        ColumnType::Blob => match array.data_type() {
            ArrowType::LargeBinary => Value::Blob(array.as_binary::<i64>().value(row).to_vec()),
            _ => Value::Blob(array.as_binary::<i32>().value(row).to_vec()),
        },
        ColumnType::List(element) | ColumnType::Set(element) => {
            let items = array.as_list::<i32>().value(row);
            let values = (0..items.len())
                .map(|i| value_at(&items, element, i))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if matches!(column_type, ColumnType::Set(_)) {
                Value::Set(values)
            } else {
                Value::List(values)
            }
        }
        ColumnType::Map(_, _) => return Err("map columns are not decoded from Arrow".into()),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, ListArray, StringArray, TimestampSecondArray};

    #[test]
    fn test_from_arrow_schema() {
        let schema = Schema::new(vec![
            Field::new("word", ArrowType::Utf8, false),
            Field::new("count", ArrowType::Int32, true),
        ]);
        let columns = ColumnMetadata::from_arrow_schema(&schema).unwrap();
        assert_eq!(columns.names(), vec!["word", "count"]);
        assert!(!columns.get(0).unwrap().nullable);
        assert_eq!(columns.get(1).unwrap().column_type, ColumnType::Int);
    }

    #[test]
    fn test_unsupported_arrow_type() {
        let schema = Schema::new(vec![Field::new("d", ArrowType::Float16, true)]);
        assert!(matches!(
            ColumnMetadata::from_arrow_schema(&schema),
            Err(RowbindError::SchemaError(_))
        ));
    }

    #[test]
    fn test_rows_from_record_batch() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("word", ArrowType::Utf8, false),
            Field::new("count", ArrowType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["foo", "bar"])) as ArrayRef,
                Arc::new(Int32Array::from(vec![Some(10), None])) as ArrayRef,
            ],
        )
        .unwrap();

        let columns = ColumnMetadata::from_arrow_schema(&schema).unwrap();
        let rows = rows_from_record_batch(&columns, &batch).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], Row::new(vec![Value::Text("foo".into()), Value::Int(10)]));
        assert_eq!(rows[1], Row::new(vec![Value::Text("bar".into()), Value::Null]));
    }

    #[test]
    fn test_batch_type_mismatch_is_schema_error() {
        let schema = Arc::new(Schema::new(vec![Field::new("n", ArrowType::Utf8, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["seven"])) as ArrayRef],
        )
        .unwrap();
        let columns =
            ColumnMetadata::new(vec![ColumnDef::new("n", ColumnType::Int).unwrap()]).unwrap();

        let err = rows_from_record_batch(&columns, &batch).unwrap_err();
        assert!(matches!(err, RowbindError::SchemaError(ref msg) if msg.contains("'n'")));
    }

    #[test]
    fn test_unsupported_timestamp_unit_is_schema_error() {
        let array = TimestampSecondArray::from(vec![1_709_294_400]);
        let schema = Arc::new(Schema::new(vec![Field::new(
            "at",
            array.data_type().clone(),
            false,
        )]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(array) as ArrayRef]).unwrap();
        let columns =
            ColumnMetadata::new(vec![ColumnDef::new("at", ColumnType::Timestamp).unwrap()])
                .unwrap();

        assert!(matches!(
            rows_from_record_batch(&columns, &batch),
            Err(RowbindError::SchemaError(_))
        ));
    }

    #[test]
    fn test_list_batch_feeds_set_column() {
        let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![Some(vec![
            Some(1),
            Some(2),
        ])]);
        let schema = Arc::new(Schema::new(vec![Field::new(
            "tags",
            list.data_type().clone(),
            true,
        )]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(list) as ArrayRef]).unwrap();
        let columns = ColumnMetadata::new(vec![
            ColumnDef::new("tags", ColumnType::set(ColumnType::Int)).unwrap(),
        ])
        .unwrap();

        let rows = rows_from_record_batch(&columns, &batch).unwrap();
        assert_eq!(
            rows[0].get(0),
            Some(&Value::Set(vec![Value::Int(1), Value::Int(2)]))
        );

        let longs = ColumnMetadata::new(vec![
            ColumnDef::new("tags", ColumnType::list(ColumnType::BigInt)).unwrap(),
        ])
        .unwrap();
        assert!(rows_from_record_batch(&longs, &batch).is_err());
    }

    #[test]
    fn test_list_column_decoding() {
        let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
            Some(vec![]),
        ]);
        let schema = Arc::new(Schema::new(vec![Field::new(
            "scores",
            list.data_type().clone(),
            true,
        )]));
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(list) as ArrayRef]).unwrap();

        let columns = ColumnMetadata::from_arrow_schema(&schema).unwrap();
        assert_eq!(columns.get(0).unwrap().column_type, ColumnType::list(ColumnType::Int));

        let rows = rows_from_record_batch(&columns, &batch).unwrap();
        assert_eq!(
            rows[0].get(0),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(rows[1].get(0), Some(&Value::List(vec![])));
    }
}
