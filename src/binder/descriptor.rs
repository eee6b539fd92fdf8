//! Target descriptors: the shape a row should be converted into.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert::TargetType;
use crate::error::ResolutionError;
use crate::mapping::FromValue;

/// A named field of a record target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Host field name.
    pub name: String,
    /// Host type of the field.
    pub target_type: TargetType,
    /// Column that feeds this field regardless of naming conventions.
    pub column: Option<String>,
}

impl FieldDescriptor {
    /// Creates a field matched by naming conventions.
    #[must_use]
    pub fn new(name: impl Into<String>, target_type: TargetType) -> Self {
        FieldDescriptor {
            name: name.into(),
            target_type,
            column: None,
        }
    }
}

/// Positional target: column `i` of the projection feeds element `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleShape {
    /// Element types in order.
    pub element_types: Vec<TargetType>,
}

impl TupleShape {
    /// Creates a tuple shape.
    #[must_use]
    pub fn new(element_types: Vec<TargetType>) -> Self {
        TupleShape { element_types }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.element_types.len()
    }
}

/// Named target built through a constructor and optional setters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordShape {
    /// Host type name, used in messages.
    pub type_name: String,
    /// Constructor parameters in declared order. All are required.
    pub constructor_params: Vec<FieldDescriptor>,
    /// Settable properties. Bound when a column matches, skipped otherwise.
    pub setter_props: Vec<FieldDescriptor>,
}

impl RecordShape {
    /// Creates an empty record shape.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        RecordShape {
            type_name: type_name.into(),
            constructor_params: Vec::new(),
            setter_props: Vec::new(),
        }
    }

    /// Appends a constructor parameter typed after `T`.
    #[must_use]
    pub fn param<T: FromValue>(self, name: impl Into<String>) -> Self {
        self.param_typed(name, T::target_type())
    }

    /// Appends a constructor parameter with an explicit target type.
    #[must_use]
    pub fn param_typed(mut self, name: impl Into<String>, target_type: TargetType) -> Self {
        self.constructor_params
            .push(FieldDescriptor::new(name, target_type));
        self
    }

    /// Appends a setter property typed after `T`.
    #[must_use]
    pub fn setter<T: FromValue>(self, name: impl Into<String>) -> Self {
        self.setter_typed(name, T::target_type())
    }

    /// Appends a setter property with an explicit target type.
    #[must_use]
    pub fn setter_typed(mut self, name: impl Into<String>, target_type: TargetType) -> Self {
        self.setter_props.push(FieldDescriptor::new(name, target_type));
        self
    }

    /// Binds `field` to `column` explicitly. Applies to every field with that name.
    #[must_use]
    pub fn alias(mut self, field: &str, column: impl Into<String>) -> Self {
        let column = column.into();
        for f in self
            .constructor_params
            .iter_mut()
            .chain(self.setter_props.iter_mut())
            .filter(|f| f.name == field)
        {
            f.column = Some(column.clone());
        }
        self
    }

    /// Returns the setters that are not shadowed by a constructor parameter,
    /// in declared order.
    pub fn effective_setters(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.setter_props.iter().filter(|s| {
            !self
                .constructor_params
                .iter()
                .any(|p| p.name == s.name)
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ResolutionError> {
        if self.constructor_params.is_empty() && self.setter_props.is_empty() {
            return Err(ResolutionError::InvalidDescriptor(format!(
                "{} declares no fields",
                self.type_name
            )));
        }
        for (kind, fields) in [
            ("constructor parameter", &self.constructor_params),
            ("setter", &self.setter_props),
        ] {
            let mut seen = HashSet::new();
            for f in fields {
                if !seen.insert(f.name.as_str()) {
                    return Err(ResolutionError::InvalidDescriptor(format!(
                        "{} declares {kind} '{}' twice",
                        self.type_name, f.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Structural description of the host type a row is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDescriptor {
    /// Positional tuple.
    Tuple(TupleShape),
    /// Named record.
    Record(RecordShape),
    /// Key-value pair; each side is a tuple or a record.
    Pair(Box<TargetDescriptor>, Box<TargetDescriptor>),
}

impl TargetDescriptor {
    /// Creates a pair descriptor.
    #[must_use]
    pub fn pair(key: impl Into<TargetDescriptor>, value: impl Into<TargetDescriptor>) -> Self {
        TargetDescriptor::Pair(Box::new(key.into()), Box::new(value.into()))
    }

    /// Creates a tuple descriptor.
    #[must_use]
    pub fn tuple(element_types: Vec<TargetType>) -> Self {
        TargetDescriptor::Tuple(TupleShape::new(element_types))
    }
}

impl From<TupleShape> for TargetDescriptor {
    fn from(shape: TupleShape) -> Self {
        TargetDescriptor::Tuple(shape)
    }
}

impl From<RecordShape> for TargetDescriptor {
    fn from(shape: RecordShape) -> Self {
        TargetDescriptor::Record(shape)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDescriptor::Tuple(shape) => {
                f.write_str("(")?;
                for (i, t) in shape.element_types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str(")")
            }
            TargetDescriptor::Record(shape) => f.write_str(&shape.type_name),
            TargetDescriptor::Pair(k, v) => write!(f, "KV[{k}, {v}]"),
        }
    }
}
