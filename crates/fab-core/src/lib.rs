//! fab-core: Motor de orquestación Flow/Step para el pipeline de diseño
//! físico.
//!
//! El motor secuencia decenas de steps independientes, cada uno envolviendo
//! una única invocación a una herramienta externa, y enhebra un `State`
//! inmutable de step en step. Este crate define:
//! - `Step` / `CompositeStep`: el contrato de un paso (formatos de entrada y
//!   salida declarados, variables propias, hook `on_alert`).
//! - `Flow` / `SequentialFlow`: construcción de la lista ordenada (con
//!   sustituciones por patrón), gating por variables de configuración y el
//!   ejecutor secuencial con persistencia por step.
//! - Clasificación de la salida de herramientas en `Alert`s que deciden el
//!   éxito o fracaso del step.
//! - Registros con nombre a nivel de proceso para steps y flujos.
pub mod alert;
pub mod errors;
pub mod flow;
pub mod metrics;
pub mod pattern;
pub mod registry;
pub mod step;
pub mod toolbox;

pub use alert::{Alert, AlertClass, DefaultOutputProcessor, OutputProcessor};
pub use errors::{FlowError, StepError, StepException, StepFailure};
pub use flow::sequential::{FlowResult, FlowStatus, SequentialFlow, StepRecord, StepStatus};
pub use flow::{FlowDefinition, Substitution};
pub use registry::{flow_registry, step_registry, Registry, StepFactory};
pub use step::composite::CompositeStep;
pub use step::{Step, StepContext, StepUpdate};
pub use toolbox::Toolbox;
