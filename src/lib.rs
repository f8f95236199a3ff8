//! fabflow-rust: armado de flujos concretos sobre el motor fab-core.
//!
//! Los crates del workspace se reparten así:
//! - `fab-domain`: formatos de diseño, `State` inmutable y métricas.
//! - `fab-config`: variables tipadas, deprecación con migración y resolución
//!   a un `Config` inmutable.
//! - `fab-core`: contrato Step/CompositeStep, ejecutor secuencial con
//!   gating y sustituciones, clasificación de alerts y registros globales.
//! - `fab-adapters`: steps reutilizables sobre herramientas externas.
//!
//! Aquí viven las definiciones de flujo listas para usar y el binario de
//! demostración.
pub mod flows;
