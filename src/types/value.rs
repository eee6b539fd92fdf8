//! Value and `ColumnType` definitions for rowbind.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Native storage type tag of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Boolean.
    Boolean,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// UTF-8 string.
    Text,
    /// Instant with millisecond or finer precision, in UTC.
    Timestamp,
    /// Calendar date without time zone.
    Date,
    /// 128-bit UUID.
    Uuid,
    /// Opaque bytes.
    Blob,
    /// Ordered collection.
    List(Box<ColumnType>),
    /// Collection of distinct elements.
    Set(Box<ColumnType>),
    /// Key-value collection.
    Map(Box<ColumnType>, Box<ColumnType>),
}

impl ColumnType {
    /// Shorthand for `list<element>`.
    #[must_use]
    pub fn list(element: ColumnType) -> Self {
        ColumnType::List(Box::new(element))
    }

    /// Shorthand for `set<element>`.
    #[must_use]
    pub fn set(element: ColumnType) -> Self {
        ColumnType::Set(Box::new(element))
    }

    /// Shorthand for `map<key, value>`.
    #[must_use]
    pub fn map(key: ColumnType, value: ColumnType) -> Self {
        ColumnType::Map(Box::new(key), Box::new(value))
    }

    /// Returns the name of the scalar type, or the collection kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::SmallInt => "smallint",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Uuid => "uuid",
            ColumnType::Blob => "blob",
            ColumnType::List(_) => "list",
            ColumnType::Set(_) => "set",
            ColumnType::Map(_, _) => "map",
        }
    }

    /// Returns whether this type is a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ColumnType::List(_) | ColumnType::Set(_) | ColumnType::Map(_, _)
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::List(e) => write!(f, "list<{e}>"),
            ColumnType::Set(e) => write!(f, "set<{e}>"),
            ColumnType::Map(k, v) => write!(f, "map<{k}, {v}>"),
            scalar => f.write_str(scalar.name()),
        }
    }
}

/// Raw value of a single column in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 16-bit signed integer value.
    SmallInt(i16),
    /// 32-bit signed integer value.
    Int(i32),
    /// 64-bit signed integer value.
    BigInt(i64),
    /// 32-bit floating point value.
    Float(f32),
    /// 64-bit floating point value.
    Double(f64),
    /// String value.
    Text(String),
    /// Timestamp value.
    Timestamp(DateTime<Utc>),
    /// Date value.
    Date(NaiveDate),
    /// UUID value.
    Uuid(Uuid),
    /// Byte string value.
    Blob(Vec<u8>),
    /// List elements.
    List(Vec<Value>),
    /// Set elements, in the order the source produced them.
    Set(Vec<Value>),
    /// Map entries, in the order the source produced them.
    Map(Vec<(Value, Value)>),
}

// Manual Hash implementation because f32/f64 doesn't implement Hash
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::SmallInt(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::Float(v) => float_bits(f64::from(*v)).hash(state),
            Value::Double(v) => float_bits(*v).hash(state),
            Value::Text(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::List(v) | Value::Set(v) => v.hash(state),
            Value::Map(v) => v.hash(state),
        }
    }
}

// 0.0 and -0.0 compare equal, so they share a hash.
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

// Manual Eq implementation because f64 doesn't implement Eq
impl Eq for Value {}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::SmallInt(_) => "smallint",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Uuid(_) => "uuid",
            Value::Blob(_) => "blob",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Checks whether this value is a valid instance of `column_type`.
    ///
    /// Null conforms to every type; nullability is checked elsewhere.
    #[must_use]
    pub fn conforms_to(&self, column_type: &ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, _)
            | (Value::Boolean(_), ColumnType::Boolean)
            | (Value::SmallInt(_), ColumnType::SmallInt)
            | (Value::Int(_), ColumnType::Int)
            | (Value::BigInt(_), ColumnType::BigInt)
            | (Value::Float(_), ColumnType::Float)
            | (Value::Double(_), ColumnType::Double)
            | (Value::Text(_), ColumnType::Text)
            | (Value::Timestamp(_), ColumnType::Timestamp)
            | (Value::Date(_), ColumnType::Date)
            | (Value::Uuid(_), ColumnType::Uuid)
            | (Value::Blob(_), ColumnType::Blob) => true,
            (Value::List(items), ColumnType::List(element))
            | (Value::Set(items), ColumnType::Set(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            (Value::Map(entries), ColumnType::Map(key, value)) => entries
                .iter()
                .all(|(k, v)| k.conforms_to(key) && v.conforms_to(value)),
            _ => false,
        }
    }

    /// Attempts to extract a bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer of any width as i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(i) => Some(i64::from(*i)),
            Value::Int(i) => Some(i64::from(*i)),
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a floating point value of either width as f64.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract a timestamp.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Attempts to extract a UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::SmallInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Timestamp(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Uuid(v) => write!(f, "{}", v.hyphenated()),
            Value::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Set(items) => write_seq(f, "{", items, "}"),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_display() {
        assert_eq!(ColumnType::Text.to_string(), "text");
        assert_eq!(ColumnType::list(ColumnType::Int).to_string(), "list<int>");
        assert_eq!(
            ColumnType::map(ColumnType::Text, ColumnType::set(ColumnType::Uuid)).to_string(),
            "map<text, set<uuid>>"
        );
    }

    #[test]
    fn test_conforms_to_collections() {
        let list = Value::List(vec![Value::Int(1), Value::Null, Value::Int(3)]);
        assert!(list.conforms_to(&ColumnType::list(ColumnType::Int)));
        assert!(!list.conforms_to(&ColumnType::list(ColumnType::BigInt)));
        assert!(!list.conforms_to(&ColumnType::set(ColumnType::Int)));
        assert!(Value::Null.conforms_to(&ColumnType::Blob));
    }

    #[test]
    fn test_signed_zero_hashes_alike() {
        use std::collections::HashSet;

        let set: HashSet<Value> = [
            Value::Double(0.0),
            Value::Double(-0.0),
            Value::Float(-0.0),
            Value::Float(0.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::Double(-0.0)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Blob(vec![0xca, 0xfe]).to_string(), "0xcafe");
        assert_eq!(
            Value::List(vec![Value::Text("a".into()), Value::Int(2)]).to_string(),
            "[a, 2]"
        );
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-02-29");
    }
}
