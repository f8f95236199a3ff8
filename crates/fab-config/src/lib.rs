//! fab-config: Declaración y resolución de variables de configuración.
//!
//! Una `Variable` es una declaración tipada y autovalidante: nombre estable,
//! tipo, default opcional, alias deprecados (con función de migración
//! opcional) y marca de alcance PDK. La resolución funde la entrada cruda del
//! usuario con los defaults del PDK y produce un `Config` inmutable, o falla
//! con un error que identifica la variable ofensora. La resolución es todo o
//! nada: un flujo jamás arranca con configuración parcialmente válida.
pub mod config;
pub mod error;
pub mod resolver;
pub mod value;
pub mod variable;

pub use config::Config;
pub use error::ConfigError;
pub use resolver::resolve;
pub use value::VarValue;
pub use variable::{DeprecatedName, VarKind, Variable};
