//! `FromValue`/`IntoValue` for host field types.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::convert::{ConvertFailure, TargetType};
use crate::types::Value;

use super::{FromValue, IntoValue};

type FromResult<T> = Result<T, ConvertFailure>;

/// Owned bytes of a blob column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Blob(pub Vec<u8>);

macro_rules! scalar_value {
    ($ty:ty, $target:ident, $variant:ident, $expected:literal) => {
        impl FromValue for $ty {
            fn target_type() -> TargetType {
                TargetType::$target
            }

            fn from_value(value: Value) -> FromResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ConvertFailure::unexpected($expected, &other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

scalar_value!(bool, Bool, Boolean, "boolean");
scalar_value!(i16, I16, SmallInt, "smallint");
scalar_value!(f32, F32, Float, "float");
scalar_value!(String, String, Text, "text");
scalar_value!(DateTime<Utc>, Timestamp, Timestamp, "timestamp");
scalar_value!(NaiveDate, Date, Date, "date");
scalar_value!(Uuid, Uuid, Uuid, "uuid");

impl FromValue for i32 {
    fn target_type() -> TargetType {
        TargetType::I32
    }

    fn from_value(value: Value) -> FromResult<Self> {
        match value {
            Value::SmallInt(v) => Ok(i32::from(v)),
            Value::Int(v) => Ok(v),
            other => Err(ConvertFailure::unexpected("int", &other)),
        }
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i64 {
    fn target_type() -> TargetType {
        TargetType::I64
    }

    fn from_value(value: Value) -> FromResult<Self> {
        value
            .as_i64()
            .ok_or_else(|| ConvertFailure::unexpected("integer", &value))
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::BigInt(self)
    }
}

impl FromValue for f64 {
    fn target_type() -> TargetType {
        TargetType::F64
    }

    fn from_value(value: Value) -> FromResult<Self> {
        value
            .as_f64()
            .ok_or_else(|| ConvertFailure::unexpected("double", &value))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for Blob {
    fn target_type() -> TargetType {
        TargetType::Bytes
    }

    fn from_value(value: Value) -> FromResult<Self> {
        match value {
            Value::Blob(bytes) => Ok(Blob(bytes)),
            other => Err(ConvertFailure::unexpected("blob", &other)),
        }
    }
}

impl IntoValue for Blob {
    fn into_value(self) -> Value {
        Value::Blob(self.0)
    }
}

impl FromValue for Value {
    fn target_type() -> TargetType {
        TargetType::Value
    }

    fn from_value(value: Value) -> FromResult<Self> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn target_type() -> TargetType {
        TargetType::option(T::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

fn elements<T: FromValue>(value: Value) -> FromResult<impl Iterator<Item = FromResult<T>>> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items.into_iter().map(T::from_value)),
        other => Err(ConvertFailure::unexpected("collection", &other)),
    }
}

fn entries(value: Value) -> FromResult<Vec<(Value, Value)>> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ConvertFailure::unexpected("map", &other)),
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn target_type() -> TargetType {
        TargetType::list(T::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        elements(value)?.collect()
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn target_type() -> TargetType {
        TargetType::set(T::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        elements(value)?.collect()
    }
}

impl<T: IntoValue> IntoValue for HashSet<T> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn target_type() -> TargetType {
        TargetType::set(T::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        elements(value)?.collect()
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn target_type() -> TargetType {
        TargetType::map(K::target_type(), V::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn target_type() -> TargetType {
        TargetType::map(K::target_type(), V::target_type())
    }

    fn from_value(value: Value) -> FromResult<Self> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_types_compose() {
        assert_eq!(
            <Option<Vec<String>>>::target_type(),
            TargetType::option(TargetType::list(TargetType::String))
        );
        assert_eq!(
            <BTreeMap<String, HashSet<Uuid>>>::target_type(),
            TargetType::map(TargetType::String, TargetType::set(TargetType::Uuid))
        );
    }

    #[test]
    fn test_integer_extraction_widens() {
        assert_eq!(i64::from_value(Value::Int(7)), Ok(7));
        assert_eq!(i32::from_value(Value::SmallInt(-2)), Ok(-2));
        assert!(i32::from_value(Value::BigInt(1)).is_err());
    }

    #[test]
    fn test_option_null() {
        assert_eq!(<Option<String>>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i64>::None.into_value(), Value::Null);
        assert!(String::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_collections() {
        let raw = Value::List(vec![Value::BigInt(3), Value::BigInt(1), Value::BigInt(3)]);
        let set = BTreeSet::<i64>::from_value(raw.clone()).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(Vec::<i64>::from_value(raw).unwrap(), vec![3, 1, 3]);

        let map = Value::Map(vec![(Value::Text("a".into()), Value::Double(1.5))]);
        let parsed = HashMap::<String, f64>::from_value(map).unwrap();
        assert_eq!(parsed.get("a"), Some(&1.5));
    }

    #[test]
    fn test_blob_round_trip() {
        let value = Blob(vec![0xde, 0xad]).into_value();
        assert_eq!(value, Value::Blob(vec![0xde, 0xad]));
        assert_eq!(Blob::from_value(value), Ok(Blob(vec![0xde, 0xad])));
    }
}
