//! Host value to column type coercion for the write path.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::types::{ColumnType, Value};

use super::{ConvertFailure, ConvertResult};

/// Coerces a host value into the representation of `column_type`.
///
/// Integers narrow with range checks, text parses into temporal and uuid
/// columns, and scalars render into text columns. Null passes through;
/// nullability is the caller's concern.
///
/// # Errors
///
/// Returns a failure when the value cannot represent the column type.
pub fn coerce_to_column(value: &Value, column_type: &ColumnType) -> ConvertResult {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if !column_type.is_collection() && value.conforms_to(column_type) {
        return Ok(value.clone());
    }

    match column_type {
        ColumnType::Boolean => value
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| ConvertFailure::unexpected("boolean", value)),
        ColumnType::SmallInt => narrow(value, "smallint").map(Value::SmallInt),
        ColumnType::Int => narrow(value, "int").map(Value::Int),
        ColumnType::BigInt => integer(value, "bigint").map(Value::BigInt),
        ColumnType::Float => to_f32(value),
        ColumnType::Double => number(value).map(Value::Double),
        ColumnType::Text => match value {
            Value::Text(s) => Ok(Value::Text(s.clone())),
            Value::Blob(_) | Value::List(_) | Value::Set(_) | Value::Map(_) => {
                Err(ConvertFailure::unexpected("scalar", value))
            }
            scalar => Ok(Value::Text(scalar.to_string())),
        },
        ColumnType::Timestamp => to_timestamp(value),
        ColumnType::Date => to_date(value),
        ColumnType::Uuid => match value {
            Value::Uuid(id) => Ok(Value::Uuid(*id)),
            Value::Text(s) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|e| ConvertFailure(format!("invalid uuid '{s}': {e}"))),
            other => Err(ConvertFailure::unexpected("uuid", other)),
        },
        ColumnType::Blob => match value {
            Value::Blob(b) => Ok(Value::Blob(b.clone())),
            other => Err(ConvertFailure::unexpected("blob", other)),
        },
        ColumnType::List(element) => elements(value, element).map(Value::List),
        ColumnType::Set(element) => {
            let mut items = elements(value, element)?;
            let mut seen = HashSet::with_capacity(items.len());
            items.retain(|v| seen.insert(v.clone()));
            Ok(Value::Set(items))
        }
        ColumnType::Map(key, val) => {
            let Value::Map(entries) = value else {
                return Err(ConvertFailure::unexpected("map", value));
            };
            entries
                .iter()
                .map(|(k, v)| Ok((coerce_to_column(k, key)?, coerce_to_column(v, val)?)))
                .collect::<Result<Vec<_>, ConvertFailure>>()
                .map(Value::Map)
        }
    }
}

fn integer(value: &Value, expected: &str) -> Result<i64, ConvertFailure> {
    match value {
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| ConvertFailure(format!("invalid {expected} '{s}': {e}"))),
        other => other
            .as_i64()
            .ok_or_else(|| ConvertFailure::unexpected(expected, other)),
    }
}

fn narrow<T: TryFrom<i64>>(value: &Value, expected: &str) -> Result<T, ConvertFailure> {
    let wide = integer(value, expected)?;
    T::try_from(wide).map_err(|_| ConvertFailure(format!("{wide} is out of range for {expected}")))
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Value) -> Result<f64, ConvertFailure> {
    value
        .as_f64()
        .or_else(|| value.as_i64().map(|i| i as f64))
        .ok_or_else(|| ConvertFailure::unexpected("number", value))
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(value: &Value) -> ConvertResult {
    match value {
        Value::Float(v) => Ok(Value::Float(*v)),
        other => {
            let wide = number(other)?;
            if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
                return Err(ConvertFailure(format!("{wide} is out of range for float")));
            }
            Ok(Value::Float(wide as f32))
        }
    }
}

fn to_timestamp(value: &Value) -> ConvertResult {
    match value {
        Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
        Value::Text(s) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| ConvertFailure(format!("invalid timestamp '{s}': {e}"))),
        Value::BigInt(millis) => DateTime::from_timestamp_millis(*millis)
            .map(Value::Timestamp)
            .ok_or_else(|| ConvertFailure(format!("{millis} is out of range for timestamp"))),
        other => Err(ConvertFailure::unexpected("timestamp", other)),
    }
}

fn to_date(value: &Value) -> ConvertResult {
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
        Value::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| ConvertFailure(format!("invalid date '{s}': {e}"))),
        other => Err(ConvertFailure::unexpected("date", other)),
    }
}

fn elements(value: &Value, element: &ColumnType) -> Result<Vec<Value>, ConvertFailure> {
    let (Value::List(items) | Value::Set(items)) = value else {
        return Err(ConvertFailure::unexpected("collection", value));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            coerce_to_column(item, element).map_err(|e| ConvertFailure(format!("element {i}: {e}")))
        })
        .collect()
}
