//! `RowType` for tuples and key-value pairs.

use crate::binder::TargetDescriptor;
use crate::error::{Result, RowbindError};
use crate::materializer::Instance;
use crate::types::Value;

use super::{FromValue, RowType};

/// A key-value pair target. Each side is a tuple or a record row type.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    /// Creates a pair.
    pub fn new(key: K, value: V) -> Self {
        KeyValue { key, value }
    }

    /// Splits the pair.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: RowType, V: RowType> RowType for KeyValue<K, V> {
    fn descriptor() -> TargetDescriptor {
        TargetDescriptor::pair(K::descriptor(), V::descriptor())
    }

    fn from_instance(instance: Instance) -> Result<Self> {
        let (key, value) = instance.into_pair()?;
        Ok(KeyValue {
            key: K::from_instance(key)?,
            value: V::from_instance(value)?,
        })
    }
}

fn element<T: FromValue>(values: &mut impl Iterator<Item = Value>, pos: &mut usize) -> Result<T> {
    let index = *pos;
    *pos += 1;
    let value = values.next().ok_or_else(|| {
        RowbindError::ExtractionError(format!("tuple has no element {index}"))
    })?;
    T::from_value(value)
        .map_err(|e| RowbindError::ExtractionError(format!("tuple element {index}: {e}")))
}

macro_rules! tuple_row_type {
    ($arity:literal; $($name:ident),+) => {
        impl<$($name: FromValue),+> RowType for ($($name,)+) {
            fn descriptor() -> TargetDescriptor {
                TargetDescriptor::tuple(vec![$(<$name as FromValue>::target_type()),+])
            }

            fn from_instance(instance: Instance) -> Result<Self> {
                let values = instance.into_tuple()?;
                if values.len() != $arity {
                    return Err(RowbindError::ExtractionError(format!(
                        "expected {} tuple elements, found {}",
                        $arity,
                        values.len()
                    )));
                }
                let mut values = values.into_iter();
                let mut pos = 0;
                Ok(($(element::<$name>(&mut values, &mut pos)?,)+))
            }
        }
    };
}

tuple_row_type!(1; A);
tuple_row_type!(2; A, B);
tuple_row_type!(3; A, B, C);
tuple_row_type!(4; A, B, C, D);
tuple_row_type!(5; A, B, C, D, E);
tuple_row_type!(6; A, B, C, D, E, F);
tuple_row_type!(7; A, B, C, D, E, F, G);
tuple_row_type!(8; A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TargetType;

    #[test]
    fn test_tuple_descriptor() {
        assert_eq!(
            <(String, i64)>::descriptor(),
            TargetDescriptor::tuple(vec![TargetType::String, TargetType::I64])
        );
    }

    #[test]
    fn test_tuple_from_instance() {
        let instance = Instance::Tuple(vec![Value::Text("bar".into()), Value::BigInt(20)]);
        let (word, count) = <(String, i64)>::from_instance(instance).unwrap();
        assert_eq!((word.as_str(), count), ("bar", 20));
    }

    #[test]
    fn test_tuple_wrong_element_type() {
        let instance = Instance::Tuple(vec![Value::BigInt(20), Value::BigInt(20)]);
        let err = <(String, i64)>::from_instance(instance).unwrap_err();
        assert!(err.to_string().contains("tuple element 0"));
    }

    #[test]
    fn test_key_value() {
        let instance = Instance::Pair(
            Box::new(Instance::Tuple(vec![Value::Text("k".into())])),
            Box::new(Instance::Tuple(vec![Value::Boolean(true)])),
        );
        let kv = KeyValue::<(String,), (bool,)>::from_instance(instance).unwrap();
        assert_eq!(kv.into_parts(), (("k".to_string(),), (true,)));
    }
}
