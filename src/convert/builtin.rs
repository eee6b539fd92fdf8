//! Built-in scalar and composite converters.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::types::{ColumnType, Value};

use super::{ConvertFailure, ConvertResult, Converter, ConverterRef, TargetType};

/// Signature of the built-in scalar conversions.
pub(super) type ScalarFn = fn(&Value) -> ConvertResult;

/// Returns the built-in conversion from `source` to a scalar `target`, if any.
pub(super) fn scalar_converter(source: &ColumnType, target: &TargetType) -> Option<ScalarFn> {
    use ColumnType as C;
    use TargetType as T;

    let func: ScalarFn = match (source, target) {
        (C::Boolean, T::Bool) => to_bool,
        (C::SmallInt, T::I16) => to_i16,
        (C::SmallInt | C::Int, T::I32) => to_i32,
        (C::SmallInt | C::Int | C::BigInt, T::I64) => to_i64,
        (C::Timestamp, T::I64) => timestamp_to_millis,
        (C::Float, T::F32) => to_f32,
        (C::SmallInt | C::Int | C::BigInt | C::Float | C::Double, T::F64) => to_f64,
        (C::Text, T::String) => to_text,
        (
            C::Boolean
            | C::SmallInt
            | C::Int
            | C::BigInt
            | C::Float
            | C::Double
            | C::Timestamp
            | C::Date
            | C::Uuid,
            T::String,
        ) => to_display_string,
        (C::Timestamp, T::Timestamp) => to_timestamp,
        (C::Text, T::Timestamp) => parse_timestamp,
        (C::Date, T::Date) => to_date,
        (C::Timestamp, T::Date) => timestamp_to_date,
        (C::Text, T::Date) => parse_date,
        (C::Uuid, T::Uuid) => to_uuid,
        (C::Text, T::Uuid) => parse_uuid,
        (C::Blob, T::Bytes) => to_bytes,
        _ => return None,
    };
    Some(func)
}

/// Passes any value through unchanged.
pub(super) fn identity(value: &Value) -> ConvertResult {
    Ok(value.clone())
}

fn to_bool(value: &Value) -> ConvertResult {
    value
        .as_bool()
        .map(Value::Boolean)
        .ok_or_else(|| ConvertFailure::unexpected("boolean", value))
}

fn to_i16(value: &Value) -> ConvertResult {
    match value {
        Value::SmallInt(v) => Ok(Value::SmallInt(*v)),
        other => Err(ConvertFailure::unexpected("smallint", other)),
    }
}

fn to_i32(value: &Value) -> ConvertResult {
    match value {
        Value::SmallInt(v) => Ok(Value::Int(i32::from(*v))),
        Value::Int(v) => Ok(Value::Int(*v)),
        other => Err(ConvertFailure::unexpected("int", other)),
    }
}

fn to_i64(value: &Value) -> ConvertResult {
    value
        .as_i64()
        .map(Value::BigInt)
        .ok_or_else(|| ConvertFailure::unexpected("integer", value))
}

fn to_f32(value: &Value) -> ConvertResult {
    match value {
        Value::Float(v) => Ok(Value::Float(*v)),
        other => Err(ConvertFailure::unexpected("float", other)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: &Value) -> ConvertResult {
    match value {
        Value::Float(v) => Ok(Value::Double(f64::from(*v))),
        Value::Double(v) => Ok(Value::Double(*v)),
        other => other
            .as_i64()
            .map(|i| Value::Double(i as f64))
            .ok_or_else(|| ConvertFailure::unexpected("number", other)),
    }
}

fn to_text(value: &Value) -> ConvertResult {
    match value {
        Value::Text(s) => Ok(Value::Text(s.clone())),
        other => Err(ConvertFailure::unexpected("text", other)),
    }
}

fn to_display_string(value: &Value) -> ConvertResult {
    match value {
        Value::Blob(_) | Value::List(_) | Value::Set(_) | Value::Map(_) => {
            Err(ConvertFailure::unexpected("scalar", value))
        }
        scalar => Ok(Value::Text(scalar.to_string())),
    }
}

fn to_timestamp(value: &Value) -> ConvertResult {
    value
        .as_timestamp()
        .map(Value::Timestamp)
        .ok_or_else(|| ConvertFailure::unexpected("timestamp", value))
}

fn parse_timestamp(value: &Value) -> ConvertResult {
    let text = value
        .as_text()
        .ok_or_else(|| ConvertFailure::unexpected("text", value))?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
        .map_err(|e| ConvertFailure(format!("invalid timestamp '{text}': {e}")))
}

fn timestamp_to_millis(value: &Value) -> ConvertResult {
    value
        .as_timestamp()
        .map(|ts| Value::BigInt(ts.timestamp_millis()))
        .ok_or_else(|| ConvertFailure::unexpected("timestamp", value))
}

fn to_date(value: &Value) -> ConvertResult {
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        other => Err(ConvertFailure::unexpected("date", other)),
    }
}

fn timestamp_to_date(value: &Value) -> ConvertResult {
    value
        .as_timestamp()
        .map(|ts| Value::Date(ts.date_naive()))
        .ok_or_else(|| ConvertFailure::unexpected("timestamp", value))
}

fn parse_date(value: &Value) -> ConvertResult {
    let text = value
        .as_text()
        .ok_or_else(|| ConvertFailure::unexpected("text", value))?;
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|e| ConvertFailure(format!("invalid date '{text}': {e}")))
}

fn to_uuid(value: &Value) -> ConvertResult {
    value
        .as_uuid()
        .map(Value::Uuid)
        .ok_or_else(|| ConvertFailure::unexpected("uuid", value))
}

fn parse_uuid(value: &Value) -> ConvertResult {
    let text = value
        .as_text()
        .ok_or_else(|| ConvertFailure::unexpected("text", value))?;
    Uuid::parse_str(text)
        .map(Value::Uuid)
        .map_err(|e| ConvertFailure(format!("invalid uuid '{text}': {e}")))
}

fn to_bytes(value: &Value) -> ConvertResult {
    match value {
        Value::Blob(b) => Ok(Value::Blob(b.clone())),
        other => Err(ConvertFailure::unexpected("blob", other)),
    }
}

/// Maps null to the absent value and delegates everything else.
pub(super) struct OptionConverter {
    pub(super) inner: ConverterRef,
}

impl Converter for OptionConverter {
    fn convert(&self, value: &Value) -> ConvertResult {
        if value.is_null() {
            Ok(Value::Null)
        } else {
            self.inner.convert(value)
        }
    }
}

/// Output collection kind of an [`ElementsConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CollectionKind {
    List,
    Set,
}

/// Converts every element of a list or set column.
pub(super) struct ElementsConverter {
    pub(super) element: ConverterRef,
    pub(super) kind: CollectionKind,
}

impl Converter for ElementsConverter {
    fn convert(&self, value: &Value) -> ConvertResult {
        let items = match value {
            Value::List(items) | Value::Set(items) => items,
            other => return Err(ConvertFailure::unexpected("collection", other)),
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let converted = self
                .element
                .convert(item)
                .map_err(|e| ConvertFailure(format!("element {i}: {e}")))?;
            out.push(converted);
        }

        Ok(match self.kind {
            CollectionKind::List => Value::List(out),
            CollectionKind::Set => {
                let mut seen = HashSet::with_capacity(out.len());
                out.retain(|v| seen.insert(v.clone()));
                Value::Set(out)
            }
        })
    }
}

/// Converts the keys and values of a map column.
pub(super) struct EntriesConverter {
    pub(super) key: ConverterRef,
    pub(super) value: ConverterRef,
}

impl Converter for EntriesConverter {
    fn convert(&self, value: &Value) -> ConvertResult {
        let Value::Map(entries) = value else {
            return Err(ConvertFailure::unexpected("map", value));
        };

        entries
            .iter()
            .map(|(k, v)| {
                let k2 = self
                    .key
                    .convert(k)
                    .map_err(|e| ConvertFailure(format!("map key {k}: {e}")))?;
                let v2 = self
                    .value
                    .convert(v)
                    .map_err(|e| ConvertFailure(format!("map value for {k}: {e}")))?;
                Ok((k2, v2))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Map)
    }
}
