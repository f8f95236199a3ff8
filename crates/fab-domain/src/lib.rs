//! fab-domain: Tipos de dominio del pipeline de diseño físico.
//!
//! Este crate define el vocabulario compartido por el motor y los steps:
//! - `DesignFormat`: enumeración cerrada de clases de artefacto (netlist,
//!   base de datos de layout, GDSII, etc.) con identificador y extensión
//!   estables.
//! - `State`: snapshot inmutable de vistas (formato → ruta en disco) más las
//!   métricas acumuladas. Los steps nunca mutan un `State`; producen deltas
//!   que el motor pliega en un snapshot nuevo.
//! - `MetricValue`: valor de métrica con precisión decimal completa (nunca
//!   coma flotante binaria) y centinelas de infinito.
//! - Registros estructurados de configuración (`Macro`, `Instance`,
//!   `EcoBuffer`, `EcoDiode`) validados elemento a elemento.
pub mod errors;
pub mod format;
pub mod metric;
pub mod records;
pub mod state;

pub use errors::DomainError;
pub use format::DesignFormat;
pub use metric::MetricValue;
pub use records::{EcoBuffer, EcoDiode, Instance, Macro, Orientation};
pub use state::{MetricsUpdate, State, ViewsUpdate};
