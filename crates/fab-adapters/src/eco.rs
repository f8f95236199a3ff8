//! Rutinas ECO: inserción de celdas tardías y legalización.
//!
//! Las rutinas de dos fases (insertar, luego legalizar) se exponen como
//! `CompositeStep`: hacia el flujo son un solo step atómico. Ambas fases
//! comparten la precondición: una rutina no configurada no invoca ninguna
//! herramienta y devuelve un update vacío.
use std::process::Command;

use fab_config::{Config, VarKind, VarValue, Variable};
use fab_core::{CompositeStep, StepContext, StepFailure};
use fab_domain::DesignFormat;

use crate::tool::{output_path, ToolStep};

fn exe(config: &Config) -> String {
    config
        .str_("ODB_UTIL_EXE")
        .unwrap_or("odb-util")
        .to_string()
}

fn exe_var() -> Variable {
    Variable::new(
        "ODB_UTIL_EXE",
        VarKind::Str,
        "Executable used for database edit subcommands.",
    )
    .with_default(serde_json::json!("odb-util"))
}

fn base_command(ctx: &StepContext<'_>, subcommand: &str) -> Result<Command, StepFailure> {
    let input = ctx.view_in(DesignFormat::Odb)?;
    let mut command = Command::new(exe(ctx.config()));
    command
        .arg(subcommand)
        .arg("--input")
        .arg(input)
        .arg("--output")
        .arg(output_path(ctx, DesignFormat::Odb));
    Ok(command)
}

fn legalization_step(
    id: &'static str,
    precondition: impl Fn(&Config) -> Option<String> + Send + Sync + 'static,
) -> ToolStep {
    ToolStep::new(id, |ctx| base_command(ctx, "legalize"))
        .reads(vec![DesignFormat::Odb])
        .writes(vec![DesignFormat::Odb])
        .with_config_vars(vec![exe_var()])
        .skip_when(precondition)
}

fn ports_disabled(config: &Config) -> Option<String> {
    match config.str_("DIODE_ON_PORTS") {
        None | Some("none") => Some("'DIODE_ON_PORTS' is 'none'".to_string()),
        Some(_) => None,
    }
}

/// Inserción de diodos sobre puertos de entrada/salida, seguida de
/// legalización. `DIODE_ON_PORTS` en `"none"` salta la rutina completa en
/// los hechos: sin inserción no hay nada que legalizar.
pub fn diodes_on_ports() -> CompositeStep {
    let placement = ToolStep::new("Odb.PortDiodePlacement", |ctx| {
        let mut command = base_command(ctx, "place_port_diodes")?;
        // la precondición garantiza que el valor existe y no es "none"
        if let Some(mode) = ctx.config().str_("DIODE_ON_PORTS") {
            command.arg("--ports").arg(mode);
        }
        if let Some(cell) = ctx.config().str_("DIODE_CELL") {
            command.arg("--diode-cell").arg(cell);
        }
        Ok(command)
    })
    .reads(vec![DesignFormat::Odb])
    .writes(vec![DesignFormat::Odb])
    .with_config_vars(vec![
        Variable::new(
            "DIODE_ON_PORTS",
            VarKind::Enum(&["none", "in", "out", "both"]),
            "Always inserts diodes on the selected port directions.",
        )
        .with_default(serde_json::json!("none")),
        Variable::new(
            "DIODE_CELL",
            VarKind::Optional(Box::new(VarKind::Str)),
            "Name of the antenna repair diode cell.",
        ),
        exe_var(),
    ])
    .skip_when(ports_disabled);

    CompositeStep::new(
        "Odb.DiodesOnPorts",
        vec![
            Box::new(placement),
            Box::new(legalization_step("Odb.PortDiodeLegalization", ports_disabled)),
        ],
    )
}

/// Inserción heurística de diodos sobre redes largas, seguida de
/// legalización. La fase de inserción corre sólo si el umbral está
/// configurado.
pub fn heuristic_diode_insertion() -> CompositeStep {
    let insertion = ToolStep::new("Odb.HeuristicDiodePlacement", |ctx| {
        let mut command = base_command(ctx, "insert_heuristic_diodes")?;
        if let Some(threshold) = ctx.config().decimal("HEURISTIC_ANTENNA_THRESHOLD") {
            command.arg("--threshold").arg(threshold.to_string());
        }
        if let Some(cell) = ctx.config().str_("DIODE_CELL") {
            command.arg("--diode-cell").arg(cell);
        }
        Ok(command)
    })
    .reads(vec![DesignFormat::Odb])
    .writes(vec![DesignFormat::Odb])
    .with_config_vars(vec![
        Variable::new(
            "HEURISTIC_ANTENNA_THRESHOLD",
            VarKind::Optional(Box::new(VarKind::Decimal)),
            "Net length threshold above which a diode is inserted preemptively.",
        )
        .with_units("µm"),
        exe_var(),
    ])
    .skip_unless_truthy("HEURISTIC_ANTENNA_THRESHOLD");

    CompositeStep::new(
        "Odb.HeuristicDiodeInsertion",
        vec![
            Box::new(insertion),
            Box::new(legalization_step("Odb.HeuristicDiodeLegalization", |config| {
                if config.truthy("HEURISTIC_ANTENNA_THRESHOLD") {
                    None
                } else {
                    Some("'HEURISTIC_ANTENNA_THRESHOLD' is not set".to_string())
                }
            })),
        ],
    )
}

/// Inserción de buffers ECO declarados en la configuración.
pub fn insert_eco_buffers() -> ToolStep {
    ToolStep::new("Odb.InsertEcoBuffers", |ctx| {
        let mut command = base_command(ctx, "insert_buffers")?;
        if let Some(buffers) = ctx.config().list("INSERT_ECO_BUFFERS") {
            for entry in buffers {
                if let VarValue::EcoBuffer(buffer) = entry {
                    let mut spec = format!("{}:{}", buffer.target, buffer.buffer);
                    if let Some((x, y)) = &buffer.placement {
                        spec.push_str(&format!("@{x},{y}"));
                    }
                    command.arg("--buffer").arg(spec);
                }
            }
        }
        Ok(command)
    })
    .reads(vec![DesignFormat::Odb])
    .writes(vec![DesignFormat::Odb])
    .with_config_vars(vec![
        Variable::new(
            "INSERT_ECO_BUFFERS",
            VarKind::Optional(Box::new(VarKind::List(Box::new(VarKind::EcoBuffer)))),
            "Buffers inserted into the layout as a late engineering change order.",
        ),
        exe_var(),
    ])
    .skip_unless_truthy("INSERT_ECO_BUFFERS")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fab_core::Step;

    #[test]
    fn composites_expose_a_single_odb_to_odb_interface() {
        for composite in [diodes_on_ports(), heuristic_diode_insertion()] {
            assert_eq!(composite.inputs(), vec![DesignFormat::Odb]);
            assert_eq!(composite.outputs(), vec![DesignFormat::Odb]);
            assert_eq!(composite.sub_steps().len(), 2);
        }
    }

    #[test]
    fn composite_vars_are_the_union_of_sub_step_vars() {
        let vars = diodes_on_ports().config_vars();
        assert!(vars.iter().any(|v| v.name == "DIODE_ON_PORTS"));
        assert!(vars.iter().any(|v| v.name == "ODB_UTIL_EXE"));
        // ODB_UTIL_EXE aparece en ambos sub-steps pero una sola vez aquí
        assert_eq!(
            vars.iter().filter(|v| v.name == "ODB_UTIL_EXE").count(),
            1
        );
    }
}
