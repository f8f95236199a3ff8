//! Definiciones de flujo empaquetadas.
//!
//! `classic()` es la secuencia de referencia sobre los steps de
//! fab-adapters; las variantes se derivan de ella con sustituciones, nunca
//! copiando la lista de steps.
use std::sync::Arc;

use serde_json::json;

use fab_config::{DeprecatedName, VarKind, Variable};
use fab_core::{flow_registry, FlowDefinition};

fn migrate_unmatched_io(old: serde_json::Value) -> serde_json::Value {
    // bool heredado → literal del enum nuevo
    match old {
        serde_json::Value::Bool(true) => json!("unmatched_design"),
        _ => json!("none"),
    }
}

/// Variables a nivel de flujo de la secuencia de referencia.
fn classic_vars() -> Vec<Variable> {
    vec![
        Variable::new("RUN_CTS", VarKind::Bool, "Enables clock tree synthesis.")
            .with_default(json!(true))
            .with_deprecated(DeprecatedName::renamed("CLOCK_TREE_SYNTH")),
        Variable::new(
            "RUN_ANTENNA_REPAIR",
            VarKind::Bool,
            "Enables the antenna repair routines after routing.",
        )
        .with_default(json!(true))
        .with_deprecated(DeprecatedName::renamed("GRT_REPAIR_ANTENNAS")),
        Variable::new(
            "RUN_ECO_STEPS",
            VarKind::Bool,
            "Enables the late engineering-change-order steps.",
        )
        .with_default(json!(false)),
        Variable::new(
            "ERRORS_ON_UNMATCHED_IO",
            VarKind::Enum(&["none", "unmatched_design", "unmatched_cfg", "both"]),
            "Controls when unmatched I/O pins are treated as an error.",
        )
        .with_default(json!("unmatched_design"))
        .with_deprecated(DeprecatedName::migrated(
            "QUIT_ON_UNMATCHED_IO",
            migrate_unmatched_io,
        )),
    ]
}

/// Secuencia de referencia: obstrucciones alrededor de la PDN, rutinas de
/// diodos y ECO opcional. Los steps gateados se saltan (no se omiten de la
/// lista) cuando su variable no es verdadera.
pub fn classic() -> FlowDefinition {
    FlowDefinition::new(
        "Classic",
        vec![
            "Odb.AddPDNObstructions",
            "Odb.RemovePDNObstructions",
            "Odb.DiodesOnPorts",
            "Odb.HeuristicDiodeInsertion",
            "Odb.InsertEcoBuffers",
        ],
    )
    .with_config_vars(classic_vars())
    .with_gate("Odb.HeuristicDiodeInsertion", vec!["RUN_ANTENNA_REPAIR"])
    .with_gate("Odb.InsertEcoBuffers", vec!["RUN_ECO_STEPS"])
}

/// Variante sin rutinas de diodos, para PDKs que las resuelven en la
/// herramienta de ruteo.
pub fn no_diodes() -> FlowDefinition {
    classic()
        .derive("ClassicNoDiodes")
        .with_substitution("Odb.*Diode*", None)
}

/// Publica las definiciones en el registro global de flujos.
pub fn register_flows() {
    fab_adapters::register_builtin_steps();
    for definition in [classic(), no_diodes()] {
        let name = definition.name.clone();
        flow_registry().register(&name, Arc::new(definition));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_variant_derives_without_touching_the_base() {
        let base = classic();
        let variant = no_diodes();
        assert_eq!(base.substitutions.len(), 0);
        assert_eq!(
            variant.resolved_step_ids().unwrap(),
            vec![
                "Odb.AddPDNObstructions",
                "Odb.RemovePDNObstructions",
                "Odb.InsertEcoBuffers"
            ]
        );
    }

    #[test]
    fn registered_flows_resolve_from_the_registry() {
        register_flows();
        let classic = flow_registry().get("Classic").unwrap();
        assert!(classic.instantiate_steps().is_ok());
        assert!(flow_registry().get("ClassicNoDiodes").is_some());
    }
}
