//! Errores de resolución de configuración. Siempre fatales antes de que
//! cualquier step corra.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Variable requerida sin valor en entrada, alias, default ni PDK.
    #[error("required variable '{name}' is not set and has no default")]
    Missing { name: String },

    /// El valor crudo no valida contra el tipo declarado.
    #[error("variable '{name}': expected {expected}, given {given}")]
    Invalid {
        name: String,
        expected: String,
        given: String,
    },

    /// Valor fuera del conjunto de literales de una enumeración.
    #[error("variable '{name}': '{given}' is not one of {allowed:?}")]
    InvalidChoice {
        name: String,
        given: String,
        allowed: Vec<&'static str>,
    },

    /// El default declarado no valida contra el propio tipo de la variable.
    /// Es un bug de la declaración, no del usuario.
    #[error("variable '{name}': declared default does not match its type: {source}")]
    BadDefault {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}
