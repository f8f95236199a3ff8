//! Fusión y agregación de métricas.
//!
//! Nombres de métrica: componentes separados por `__`; los componentes
//! finales que contienen `:` son modificadores (`clave:valor`), p. ej.
//!
//! ```text
//! timing__hold_vio__count__corner:nom_tt_025C_1v80
//! ```
//!
//! La pasada de agregados deriva métricas resumen (totales por base, mínimo
//! entre corners, etc.) a partir del conjunto fusionado. Es pura y
//! re-derivable: nunca es fuente de datos crudos nuevos.
//!
//! Política por métrica (explícita, ver tabla en `policy_for`):
//! - `Sum` para conteos y áreas; un infinito absorbe a los finitos. La suma
//!   de infinitos de signo opuesto queda indefinida: se degrada a
//!   `Infinity` con una advertencia.
//! - `Min` para slacks (el peor caso es el menor).
//! - `Max` para magnitudes de violación máximas.
use indexmap::IndexMap;

use fab_domain::{MetricValue, MetricsUpdate};

/// Política de combinación de un agregado derivado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

/// Tabla explícita sufijo del nombre base → política.
pub fn policy_for(base: &str) -> Option<Aggregate> {
    const SUM: &[&str] = &["__count", "__area", "__power", "__wirelength"];
    const MIN: &[&str] = &["__ws", "__wns", "__tns", "__slack"];
    const MAX: &[&str] = &["__max_slew", "__max_cap", "__util"];

    if SUM.iter().any(|s| base.ends_with(s)) {
        Some(Aggregate::Sum)
    } else if MIN.iter().any(|s| base.ends_with(s)) {
        Some(Aggregate::Min)
    } else if MAX.iter().any(|s| base.ends_with(s)) {
        Some(Aggregate::Max)
    } else {
        None
    }
}

/// Separa el nombre base de sus modificadores finales.
pub fn parse_metric_modifiers(name: &str) -> (String, IndexMap<String, String>) {
    let components: Vec<&str> = name.split("__").collect();
    let mut modifiers = IndexMap::new();
    let mut cut = components.len();

    for component in components.iter().rev() {
        match component.split_once(':') {
            Some((key, value)) => {
                modifiers.insert(key.to_string(), value.to_string());
                cut -= 1;
            }
            None => break,
        }
    }
    // los modificadores se recolectaron de atrás hacia adelante
    modifiers.reverse();

    (components[..cut].join("__"), modifiers)
}

fn combine(policy: Aggregate, accumulated: &MetricValue, next: &MetricValue) -> MetricValue {
    match policy {
        Aggregate::Sum => accumulated.numeric_add(next).unwrap_or_else(|| {
            log::warn!("sum of opposite infinities is undefined, degrading to Infinity");
            MetricValue::Infinity
        }),
        Aggregate::Min => match accumulated.numeric_cmp(next) {
            Some(std::cmp::Ordering::Greater) => next.clone(),
            _ => accumulated.clone(),
        },
        Aggregate::Max => match accumulated.numeric_cmp(next) {
            Some(std::cmp::Ordering::Less) => next.clone(),
            _ => accumulated.clone(),
        },
    }
}

/// Pasada de agregados derivados sobre un conjunto fusionado de métricas.
///
/// Devuelve el conjunto de entrada más una entrada por cada nombre base con
/// modificadores cuya política está declarada. La pasada es re-derivable:
/// un valor base previo (agregado de una fusión anterior) se reemplaza por
/// el recálculo sobre el conjunto actual.
pub fn aggregate_metrics(metrics: &MetricsUpdate) -> MetricsUpdate {
    let mut result = metrics.clone();
    let mut derived: IndexMap<String, MetricValue> = IndexMap::new();

    for (name, value) in metrics {
        let (base, modifiers) = parse_metric_modifiers(name);
        if modifiers.is_empty() {
            continue;
        }
        let Some(policy) = policy_for(&base) else {
            continue;
        };
        if !value.is_numeric() {
            log::warn!("metric '{name}' is not numeric, excluded from aggregate '{base}'");
            continue;
        }
        match derived.get(&base) {
            Some(accumulated) => {
                let combined = combine(policy, accumulated, value);
                derived.insert(base, combined);
            }
            None => {
                derived.insert(base, value.clone());
            }
        }
    }

    for (base, value) in derived {
        if let Some(previous) = result.get(&base) {
            if *previous != value {
                log::debug!("aggregate '{base}' recomputed: {previous} -> {value}");
            }
        }
        result.insert(base, value);
    }
    result
}
