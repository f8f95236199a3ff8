//! Registros estructurados usados por variables de configuración.
//!
//! Algunas variables no son escalares: describen macros con instancias
//! posicionadas, o listas de celdas ECO a insertar. Estos registros se
//! validan elemento a elemento durante la resolución de configuración.
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orientación de colocación de una instancia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    N,
    S,
    E,
    W,
    FN,
    FS,
    FE,
    FW,
}

/// Colocación (posiblemente parcial) de una instancia de macro.
///
/// Invariante verificado por los steps de colocación: si `location` está
/// definida, `orientation` también debe estarlo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub location: Option<(Decimal, Decimal)>,
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

/// Macro instanciable en el diseño: instancias nombradas con su colocación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Macro {
    #[serde(default)]
    pub instances: IndexMap<String, Instance>,
}

impl Macro {
    /// Cantidad total de instancias con colocación configurada.
    pub fn placed_instances(&self) -> usize {
        self.instances
            .values()
            .filter(|i| i.location.is_some())
            .count()
    }
}

/// Buffer ECO a insertar sobre un driver o sink.
///
/// `target` referencia un pin en formato `instancia/pin`. Si `placement` no
/// está definido, la colocación gruesa se deriva del promedio de las
/// posiciones conectadas (responsabilidad de la herramienta externa).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoBuffer {
    pub target: String,
    pub buffer: String,
    #[serde(default)]
    pub placement: Option<(Decimal, Decimal)>,
}

/// Diodo ECO a conectar a la red de un sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoDiode {
    pub target: String,
    #[serde(default)]
    pub placement: Option<(Decimal, Decimal)>,
}
