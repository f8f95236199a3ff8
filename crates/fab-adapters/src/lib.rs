//! fab-adapters: steps reutilizables sobre el contrato de fab-core.
//!
//! Este crate no contiene lógica de ninguna herramienta de EDA: provee el
//! `ToolStep` genérico (la frontera de invocación hecha concreta), los pares
//! de steps de obstrucciones construidos desde un único helper, y las
//! rutinas compuestas de legalización. Sirve además como banco de steps
//! deterministas para las pruebas del motor.
pub mod eco;
pub mod obstructions;
pub mod tool;

pub use eco::{diodes_on_ports, heuristic_diode_insertion, insert_eco_buffers};
pub use obstructions::{add_pdn_obstructions, remove_pdn_obstructions};
pub use tool::ToolStep;

use fab_core::registry::register_step;

/// Registra todos los steps de este crate en el registro global.
pub fn register_builtin_steps() {
    register_step("Odb.AddPDNObstructions", || {
        Box::new(add_pdn_obstructions())
    });
    register_step("Odb.RemovePDNObstructions", || {
        Box::new(remove_pdn_obstructions())
    });
    register_step("Odb.DiodesOnPorts", || Box::new(diodes_on_ports()));
    register_step("Odb.HeuristicDiodeInsertion", || {
        Box::new(heuristic_diode_insertion())
    });
    register_step("Odb.InsertEcoBuffers", || Box::new(insert_eco_buffers()));
}
