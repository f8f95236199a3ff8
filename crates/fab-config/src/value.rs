//! Valor resuelto de una variable y su validación contra el tipo declarado.
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use fab_domain::{EcoBuffer, EcoDiode, Instance, Macro};

use crate::error::ConfigError;
use crate::variable::VarKind;

/// Valor validado de una variable de configuración.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VarValue {
    /// Ausencia explícita para tipos opcionales.
    None,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Str(String),
    Path(PathBuf),
    List(Vec<VarValue>),
    Map(IndexMap<String, VarValue>),
    Instance(Instance),
    Macro(Macro),
    EcoBuffer(EcoBuffer),
    EcoDiode(EcoDiode),
}

impl VarValue {
    /// Veracidad para las tablas de gating: `false`, `None`, `0`, cadena
    /// vacía y colecciones vacías son falsas; todo lo demás es verdadero.
    pub fn is_truthy(&self) -> bool {
        match self {
            VarValue::None => false,
            VarValue::Bool(b) => *b,
            VarValue::Int(i) => *i != 0,
            VarValue::Decimal(d) => !d.is_zero(),
            VarValue::Str(s) => !s.is_empty(),
            VarValue::Path(_) => true,
            VarValue::List(items) => !items.is_empty(),
            VarValue::Map(entries) => !entries.is_empty(),
            _ => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, VarValue::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            VarValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            VarValue::Decimal(d) => Some(*d),
            VarValue::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            VarValue::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[VarValue]> {
        match self {
            VarValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, VarValue>> {
        match self {
            VarValue::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

fn invalid(name: &str, kind: &VarKind, given: &Value) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        expected: kind.describe(),
        given: short_repr(given),
    }
}

fn short_repr(value: &Value) -> String {
    let repr = value.to_string();
    if repr.len() <= 60 {
        return repr;
    }
    // el corte debe caer en un límite de carácter
    let mut cut = 60;
    while !repr.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &repr[..cut])
}

fn decode_record<T: serde::de::DeserializeOwned>(
    name: &str,
    kind: &VarKind,
    raw: &Value,
) -> Result<T, ConfigError> {
    serde_json::from_value(raw.clone()).map_err(|_| invalid(name, kind, raw))
}

/// Valida y coacciona un valor crudo contra el tipo declarado.
///
/// La validación de tipos compuestos es recursiva: cada elemento de una
/// lista o mapa debe satisfacer a su vez el tipo del elemento.
pub fn validate(name: &str, kind: &VarKind, raw: &Value) -> Result<VarValue, ConfigError> {
    match kind {
        VarKind::Optional(inner) => {
            if raw.is_null() {
                Ok(VarValue::None)
            } else {
                validate(name, inner, raw)
            }
        }
        VarKind::Bool => match raw {
            Value::Bool(b) => Ok(VarValue::Bool(*b)),
            // Coerciones aceptadas por compatibilidad con configuraciones
            // heredadas: 0/1 y las cadenas usuales.
            Value::Number(n) if n.as_i64() == Some(0) => Ok(VarValue::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(VarValue::Bool(true)),
            Value::String(s) => match s.as_str() {
                "1" | "true" | "True" => Ok(VarValue::Bool(true)),
                "0" | "false" | "False" => Ok(VarValue::Bool(false)),
                _ => Err(invalid(name, kind, raw)),
            },
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Int => match raw {
            Value::Number(n) => n
                .as_i64()
                .map(VarValue::Int)
                .ok_or_else(|| invalid(name, kind, raw)),
            Value::String(s) => s
                .parse::<i64>()
                .map(VarValue::Int)
                .map_err(|_| invalid(name, kind, raw)),
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Decimal => match raw {
            Value::Number(n) => {
                let repr = n.to_string();
                Decimal::from_str(&repr)
                    .or_else(|_| Decimal::from_scientific(&repr))
                    .map(VarValue::Decimal)
                    .map_err(|_| invalid(name, kind, raw))
            }
            Value::String(s) => Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map(VarValue::Decimal)
                .map_err(|_| invalid(name, kind, raw)),
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Str => match raw {
            Value::String(s) => Ok(VarValue::Str(s.clone())),
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Path => match raw {
            Value::String(s) if !s.is_empty() => Ok(VarValue::Path(PathBuf::from(s))),
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Enum(options) => match raw {
            Value::String(s) if options.contains(&s.as_str()) => Ok(VarValue::Str(s.clone())),
            Value::String(s) => Err(ConfigError::InvalidChoice {
                name: name.to_string(),
                given: s.clone(),
                allowed: options.to_vec(),
            }),
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::List(inner) => match raw {
            Value::Array(items) => {
                let mut validated = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let element_name = format!("{name}[{index}]");
                    validated.push(validate(&element_name, inner, item)?);
                }
                Ok(VarValue::List(validated))
            }
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Map(inner) => match raw {
            Value::Object(entries) => {
                let mut validated = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    let element_name = format!("{name}[{key}]");
                    validated.insert(key.clone(), validate(&element_name, inner, item)?);
                }
                Ok(VarValue::Map(validated))
            }
            _ => Err(invalid(name, kind, raw)),
        },
        VarKind::Instance => decode_record(name, kind, raw).map(VarValue::Instance),
        VarKind::Macro => decode_record(name, kind, raw).map(VarValue::Macro),
        VarKind::EcoBuffer => decode_record(name, kind, raw).map(VarValue::EcoBuffer),
        VarKind::EcoDiode => decode_record(name, kind, raw).map(VarValue::EcoDiode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_elements_validate_recursively() {
        let kind = VarKind::List(Box::new(VarKind::Decimal));
        let ok = validate("WIDTHS", &kind, &json!(["1.5", 2, "3e-2"])).unwrap();
        let items = ok.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].as_decimal().unwrap().to_string(), "0.03");

        let err = validate("WIDTHS", &kind, &json!(["1.5", {}])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == "WIDTHS[1]"));
    }

    #[test]
    fn enum_rejects_unknown_literal() {
        let kind = VarKind::Enum(&["none", "in", "out", "both"]);
        assert!(validate("DIODE_ON_PORTS", &kind, &json!("both")).is_ok());
        let err = validate("DIODE_ON_PORTS", &kind, &json!("all")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChoice { given, .. } if given == "all"));
    }

    #[test]
    fn optional_null_is_explicit_none() {
        let kind = VarKind::Optional(Box::new(VarKind::Path));
        let value = validate("FP_DEF_TEMPLATE", &kind, &Value::Null).unwrap();
        assert!(value.is_none());
        assert!(!value.is_truthy());
    }

    #[test]
    fn eco_buffer_record_validates_elementwise() {
        let kind = VarKind::List(Box::new(VarKind::EcoBuffer));
        let ok = validate(
            "INSERT_ECO_BUFFERS",
            &kind,
            &json!([{"target": "u_core/clk", "buffer": "buf_x4", "placement": ["10", "20.5"]}]),
        )
        .unwrap();
        match &ok.as_list().unwrap()[0] {
            VarValue::EcoBuffer(buffer) => assert_eq!(buffer.target, "u_core/clk"),
            other => panic!("se esperaba EcoBuffer, hay {other:?}"),
        }

        // falta `buffer`: el elemento no valida
        let err = validate(
            "INSERT_ECO_BUFFERS",
            &kind,
            &json!([{"target": "u_core/clk"}]),
        );
        assert!(err.is_err());
    }

    #[test]
    fn long_multibyte_values_truncate_on_char_boundaries() {
        // con 40 'µ' (2 bytes cada una) el byte 60 cae dentro de un carácter
        let raw = json!("µ".repeat(40));
        let err = validate("CLOCK_PERIOD", &VarKind::Decimal, &raw).unwrap_err();
        match err {
            ConfigError::Invalid { given, .. } => {
                assert!(given.ends_with('…'));
                assert!(given.len() < raw.to_string().len());
            }
            other => panic!("se esperaba Invalid, hay {other:?}"),
        }
    }

    #[test]
    fn truthiness_of_collections() {
        assert!(!VarValue::List(vec![]).is_truthy());
        assert!(VarValue::List(vec![VarValue::Int(0)]).is_truthy());
        assert!(!VarValue::Str(String::new()).is_truthy());
    }
}
