//! Valores de métrica con precisión decimal completa.
//!
//! Las métricas provienen del archivo resumen de cada herramienta externa.
//! Reglas de parseo:
//! - Los números se conservan como `Decimal` (nunca `f64`): dimensiones
//!   físicas y cantidades eléctricas no toleran artefactos binarios.
//! - Los centinelas textuales `"Infinity"` / `"-Infinity"` se mapean a los
//!   miembros infinitos con signo.
//! - Cualquier otro texto queda como `Text` sin interpretación.
use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Valor de una métrica acumulada en el `State`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum MetricValue {
    Int(i64),
    Decimal(Decimal),
    /// Centinela `"Infinity"` del resumen de la herramienta.
    Infinity,
    /// Centinela `"-Infinity"`.
    NegInfinity,
    Bool(bool),
    Text(String),
}

impl MetricValue {
    /// `true` si el valor es numérico (incluye los infinitos con signo).
    pub fn is_numeric(&self) -> bool {
        !matches!(self, MetricValue::Text(_) | MetricValue::Bool(_))
    }

    /// Valor decimal finito, si aplica.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            MetricValue::Int(i) => Some(Decimal::from(*i)),
            MetricValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Orden numérico total: `-Infinity < finitos < Infinity`.
    /// `None` para valores no numéricos.
    pub fn numeric_cmp(&self, other: &MetricValue) -> Option<Ordering> {
        let rank = |v: &MetricValue| -> Option<i8> {
            match v {
                MetricValue::NegInfinity => Some(-1),
                MetricValue::Int(_) | MetricValue::Decimal(_) => Some(0),
                MetricValue::Infinity => Some(1),
                _ => None,
            }
        };
        let (a, b) = (rank(self)?, rank(other)?);
        if a != 0 || b != 0 {
            return Some(a.cmp(&b));
        }
        Some(self.as_decimal()?.cmp(&other.as_decimal()?))
    }

    /// Suma numérica. Un infinito absorbe a los finitos; la suma de infinitos
    /// de signo opuesto no está definida y devuelve `None`.
    pub fn numeric_add(&self, other: &MetricValue) -> Option<MetricValue> {
        use MetricValue::*;
        match (self, other) {
            (Infinity, NegInfinity) | (NegInfinity, Infinity) => None,
            (Infinity, o) | (o, Infinity) if o.is_numeric() => Some(Infinity),
            (NegInfinity, o) | (o, NegInfinity) if o.is_numeric() => Some(NegInfinity),
            (a, b) => {
                let sum = a.as_decimal()?.checked_add(b.as_decimal()?)?;
                Some(MetricValue::from_decimal(sum))
            }
        }
    }

    /// Normaliza un decimal entero a `Int` para una serialización más limpia.
    pub fn from_decimal(d: Decimal) -> MetricValue {
        if d.fract().is_zero() {
            if let Some(i) = d.trunc().to_i64() {
                return MetricValue::Int(i);
            }
        }
        MetricValue::Decimal(d)
    }
}

impl From<Value> for MetricValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => MetricValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return MetricValue::Int(i);
                }
                // `arbitrary_precision` conserva el token decimal original.
                let repr = n.to_string();
                Decimal::from_str(&repr)
                    .or_else(|_| Decimal::from_scientific(&repr))
                    .map(MetricValue::Decimal)
                    .unwrap_or(MetricValue::Text(repr))
            }
            Value::String(s) => match s.as_str() {
                "Infinity" => MetricValue::Infinity,
                "-Infinity" => MetricValue::NegInfinity,
                _ => MetricValue::Text(s),
            },
            other => MetricValue::Text(other.to_string()),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Int(i) => serializer.serialize_i64(*i),
            MetricValue::Decimal(d) => {
                rust_decimal::serde::arbitrary_precision::serialize(d, serializer)
            }
            MetricValue::Infinity => serializer.serialize_str("Infinity"),
            MetricValue::NegInfinity => serializer.serialize_str("-Infinity"),
            MetricValue::Bool(b) => serializer.serialize_bool(*b),
            MetricValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Int(i) => write!(f, "{i}"),
            MetricValue::Decimal(d) => write!(f, "{d}"),
            MetricValue::Infinity => write!(f, "Infinity"),
            MetricValue::NegInfinity => write!(f, "-Infinity"),
            MetricValue::Bool(b) => write!(f, "{b}"),
            MetricValue::Text(s) => write!(f, "{s}"),
        }
    }
}
