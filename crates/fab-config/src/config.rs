//! Configuración resuelta e inmutable de una corrida de flujo.
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

use crate::value::VarValue;

/// Mapa inmutable nombre → valor validado. Se construye una única vez por
/// corrida; después sólo hay lecturas.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Config {
    values: IndexMap<String, VarValue>,
}

impl Config {
    pub(crate) fn new(values: IndexMap<String, VarValue>) -> Self {
        Config { values }
    }

    pub fn get(&self, name: &str) -> Option<&VarValue> {
        self.values.get(name)
    }

    /// Veracidad para gating: una variable ausente cuenta como falsa.
    pub fn truthy(&self, name: &str) -> bool {
        self.values.get(name).map(VarValue::is_truthy).unwrap_or(false)
    }

    pub fn bool_(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_int()
    }

    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        self.get(name)?.as_decimal()
    }

    pub fn str_(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn path(&self, name: &str) -> Option<&PathBuf> {
        self.get(name)?.as_path()
    }

    pub fn list(&self, name: &str) -> Option<&[VarValue]> {
        self.get(name)?.as_list()
    }

    pub fn map(&self, name: &str) -> Option<&IndexMap<String, VarValue>> {
        self.get(name)?.as_map()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn absent_variable_is_not_truthy() {
        let config = Config::new(indexmap! {
            "RUN_DRT".to_string() => VarValue::Bool(true),
            "RUN_CTS".to_string() => VarValue::Bool(false),
        });
        assert!(config.truthy("RUN_DRT"));
        assert!(!config.truthy("RUN_CTS"));
        assert!(!config.truthy("RUN_NONEXISTENT"));
    }
}
