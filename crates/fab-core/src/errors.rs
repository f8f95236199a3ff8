//! Taxonomía de errores del motor.
//!
//! - `StepError`: fallo recuperable de un step (alerts clasificadas como
//!   error). Aborta el flujo pero no corrompe el `State`.
//! - `StepException`: violación de invariante (la herramienta falló sin
//!   explicar nada parseable, un step escribió un formato no declarado,
//!   etc.). Siempre fatal, nunca se reintenta en silencio.
//! - `FlowError`: errores previos o externos a la ejecución de steps
//!   (configuración inválida, definición inconsistente, E/S).
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fab_config::ConfigError;

use crate::alert::Alert;

/// Fallo recuperable: la herramienta reportó errores clasificados.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
    /// Alerts con clase `error` tras el hook `on_alert` del step.
    pub alerts: Vec<Alert>,
}

impl StepError {
    pub fn from_alerts(step_id: &str, alerts: Vec<Alert>) -> Self {
        let joined = alerts
            .iter()
            .map(Alert::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        StepError {
            message: format!("'{step_id}' failed with the following errors:\n{joined}"),
            alerts,
        }
    }
}

/// Violación de invariante del framework o del entorno.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("step invariant violated: {0}")]
pub struct StepException(pub String);

/// Resultado fallido de ejecutar un step.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepFailure {
    #[error(transparent)]
    Error(#[from] StepError),
    #[error(transparent)]
    Exception(#[from] StepException),
    /// Interrupción externa: el subproceso en vuelo fue terminado y ningún
    /// resultado parcial se pliega al `State`.
    #[error("step '{0}' interrupted")]
    Interrupted(String),
}

impl StepFailure {
    /// `true` si el fallo es un defecto de diseño reportado por la
    /// herramienta (y no un bug del framework/entorno).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StepFailure::Error(_))
    }
}

/// Errores del flujo fuera de la ejecución de steps.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("flow '{flow}': step '{step}' is not registered")]
    UnknownStep { flow: String, step: String },
    #[error("flow '{0}' is not registered")]
    UnknownFlow(String),
    #[error("flow '{flow}': substitution pattern '{pattern}' matches no step")]
    UselessSubstitution { flow: String, pattern: String },
    #[error(transparent)]
    Domain(#[from] fab_domain::DomainError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
