//! Snapshot inmutable del conjunto de artefactos y métricas.
//!
//! Rol en el flujo:
//! - El `State` inicial se construye con los artefactos semilla del usuario
//!   (p. ej. la netlist inicial) antes del primer step.
//! - Cada step produce un delta (`ViewsUpdate`, `MetricsUpdate`) que se
//!   pliega con `fold` para crear el snapshot siguiente; nunca se muta en
//!   el lugar.
//! - `fold` es un merge puro de datos: no sabe qué step produjo el delta.
//!   La disciplina de qué formatos puede escribir cada step se verifica en
//!   el contrato del step, no aquí.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::format::DesignFormat;
use crate::metric::MetricValue;

/// Delta de vistas producido por un step: formato → nueva ruta.
pub type ViewsUpdate = IndexMap<DesignFormat, PathBuf>;

/// Delta de métricas producido por un step.
pub type MetricsUpdate = IndexMap<String, MetricValue>;

/// Snapshot inmutable: vistas presentes más métricas acumuladas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    views: IndexMap<DesignFormat, PathBuf>,
    metrics: IndexMap<String, MetricValue>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construye el estado semilla a partir de vistas iniciales.
    pub fn with_views(views: ViewsUpdate) -> Self {
        State {
            views,
            metrics: IndexMap::new(),
        }
    }

    /// Vista del formato dado, si ya fue producida.
    pub fn view(&self, format: DesignFormat) -> Option<&Path> {
        self.views.get(&format).map(PathBuf::as_path)
    }

    pub fn views(&self) -> &IndexMap<DesignFormat, PathBuf> {
        &self.views
    }

    pub fn metric(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    pub fn metrics(&self) -> &IndexMap<String, MetricValue> {
        &self.metrics
    }

    /// Pliega un delta sobre este snapshot y devuelve el snapshot siguiente.
    ///
    /// Reglas:
    /// - Una vista presente en el delta reemplaza la entrada correspondiente;
    ///   las claves ausentes se arrastran sin cambios.
    /// - Las métricas se combinan clave a clave: la entrada nueva reemplaza a
    ///   la anterior (los agregados derivados se recalculan aparte, ver el
    ///   módulo de métricas del motor).
    #[must_use]
    pub fn fold(&self, views: &ViewsUpdate, metrics: &MetricsUpdate) -> State {
        let mut next = self.clone();
        for (format, path) in views {
            next.views.insert(*format, path.clone());
        }
        for (key, value) in metrics {
            next.metrics.insert(key.clone(), value.clone());
        }
        next
    }

    /// Persiste el snapshot como JSON (un archivo por step ejecutado).
    pub fn save(&self, path: &Path) -> Result<(), DomainError> {
        let serialized = serde_json::to_string_pretty(self).map_err(|source| {
            DomainError::InvalidSnapshot {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, serialized).map_err(|source| DomainError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reconstruye un snapshot persistido (inspección o reanudación).
    pub fn load(path: &Path) -> Result<State, DomainError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DomainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DomainError::InvalidSnapshot {
            path: path.to_path_buf(),
            source,
        })
    }
}
