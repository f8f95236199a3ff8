//! Alerts estructuradas parseadas de la salida de herramientas externas.
//!
//! Formato de línea esperado (convención de las herramientas del pipeline):
//!
//! ```text
//! [ERROR GRT-0116] mensaje...
//! [WARNING ODB-0220] mensaje...
//! [INFO DRT-0001] mensaje...
//! ```
//!
//! Los códigos son cadenas opacas con espacio de nombres por herramienta.
//! Las líneas que no decodifican a una alert pasan como texto de log plano.
use serde::{Deserialize, Serialize};

/// Severidad reportada por el stream de la herramienta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertClass {
    Error,
    Warning,
    Info,
}

/// Diagnóstico estructurado `(código, severidad, mensaje)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: String,
    pub class: AlertClass,
    pub message: String,
}

impl Alert {
    /// Copia reclasificada; usada por los hooks `on_alert` para degradar
    /// códigos benignos conocidos.
    #[must_use]
    pub fn reclassified(mut self, class: AlertClass) -> Alert {
        self.class = class;
        self
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let class = match self.class {
            AlertClass::Error => "ERROR",
            AlertClass::Warning => "WARNING",
            AlertClass::Info => "INFO",
        };
        write!(f, "[{} {}] {}", class, self.code, self.message)
    }
}

/// Decodificador de líneas de salida a alerts.
///
/// El primer procesador que devuelve `Some` gana; el resto de la línea
/// queda registrada como log plano si ninguno la reconoce.
pub trait OutputProcessor: Send + Sync {
    fn process_line(&self, line: &str) -> Option<Alert>;
}

/// Procesador por defecto para el formato `[SEVERIDAD CODIGO] mensaje`.
#[derive(Debug, Default)]
pub struct DefaultOutputProcessor;

impl OutputProcessor for DefaultOutputProcessor {
    fn process_line(&self, line: &str) -> Option<Alert> {
        let rest = line.trim_start().strip_prefix('[')?;
        let (head, message) = rest.split_once(']')?;
        let (severity, code) = head.split_once(' ')?;
        let class = match severity {
            "ERROR" => AlertClass::Error,
            "WARNING" => AlertClass::Warning,
            "INFO" => AlertClass::Info,
            _ => return None,
        };
        // un código válido es TOOL-NNNN; sin guión no es una alert
        if !code.contains('-') || code.contains(' ') {
            return None;
        }
        Some(Alert {
            code: code.to_string(),
            class,
            message: message.trim().to_string(),
        })
    }
}
