//! Converter lookup with custom extensions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConverterNotFound;
use crate::types::ColumnType;

use super::builtin::{
    identity, scalar_converter, CollectionKind, ElementsConverter, EntriesConverter,
    OptionConverter,
};
use super::{Converter, ConverterRef, TargetType};

/// Registry of converters from column types to host types.
///
/// Built and extended during startup, then shared behind an `Arc`. Lookups
/// are pure functions of the registry contents and the requested types.
#[derive(Default)]
pub struct ConverterRegistry {
    /// Custom converters keyed by (source, target); a `None` source matches any column type.
    custom: HashMap<(Option<ColumnType>, TargetType), Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Creates a registry holding only the built-in conversions.
    #[must_use]
    pub fn new() -> Self {
        ConverterRegistry {
            custom: HashMap::new(),
        }
    }

    /// Registers a custom converter for an exact (source, target) pair.
    ///
    /// Custom converters take precedence over the built-in rules, so this can
    /// also override a built-in conversion.
    pub fn register<C>(&mut self, source: ColumnType, target: TargetType, converter: C) -> &mut Self
    where
        C: Converter + 'static,
    {
        self.custom
            .insert((Some(source), target), Arc::new(converter));
        self
    }

    /// Registers a custom converter that accepts any column type.
    pub fn register_any_source<C>(&mut self, target: TargetType, converter: C) -> &mut Self
    where
        C: Converter + 'static,
    {
        self.custom.insert((None, target), Arc::new(converter));
        self
    }

    /// Returns the number of registered custom converters.
    #[must_use]
    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// Finds the converter from `source` to `target`.
    ///
    /// Rules, first match wins: custom converters (exact source, then any
    /// source), optional wrapping, collection element conversion, the raw
    /// value target, then built-in scalar conversions.
    ///
    /// # Errors
    ///
    /// Returns [`ConverterNotFound`] when no rule applies.
    pub fn lookup(
        &self,
        source: &ColumnType,
        target: &TargetType,
    ) -> Result<ConverterRef, ConverterNotFound> {
        let not_found = || ConverterNotFound {
            source_type: source.clone(),
            target_type: target.clone(),
        };

        if let Some(custom) = self.custom_for(source, target) {
            return Ok(ConverterRef::new(source.clone(), target.clone(), custom));
        }

        let func: Arc<dyn Converter> = match (source, target) {
            (_, TargetType::Option(inner)) => {
                let inner = self.lookup(source, inner).map_err(|_| not_found())?;
                Arc::new(OptionConverter { inner })
            }
            (ColumnType::List(element) | ColumnType::Set(element), TargetType::List(t)) => {
                Arc::new(ElementsConverter {
                    element: self.lookup(element, t).map_err(|_| not_found())?,
                    kind: CollectionKind::List,
                })
            }
            (ColumnType::List(element) | ColumnType::Set(element), TargetType::Set(t)) => {
                Arc::new(ElementsConverter {
                    element: self.lookup(element, t).map_err(|_| not_found())?,
                    kind: CollectionKind::Set,
                })
            }
            (ColumnType::Map(key, value), TargetType::Map(tk, tv)) => Arc::new(EntriesConverter {
                key: self.lookup(key, tk).map_err(|_| not_found())?,
                value: self.lookup(value, tv).map_err(|_| not_found())?,
            }),
            (_, TargetType::Value) => Arc::new(identity),
            _ => Arc::new(scalar_converter(source, target).ok_or_else(not_found)?),
        };

        Ok(ConverterRef::new(source.clone(), target.clone(), func))
    }

    fn custom_for(&self, source: &ColumnType, target: &TargetType) -> Option<Arc<dyn Converter>> {
        if self.custom.is_empty() {
            return None;
        }
        self.custom
            .get(&(Some(source.clone()), target.clone()))
            .or_else(|| self.custom.get(&(None, target.clone())))
            .cloned()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .custom
            .keys()
            .map(|(source, target)| match source {
                Some(s) => format!("{s} -> {target}"),
                None => format!("* -> {target}"),
            })
            .collect();
        keys.sort();
        f.debug_struct("ConverterRegistry")
            .field("custom", &keys)
            .finish()
    }
}
