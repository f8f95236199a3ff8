//! Par de steps de obstrucciones de PDN.
//!
//! Agregar y quitar obstrucciones son la misma invocación con distinto
//! subcomando, así que ambos steps salen de un único helper parametrizado.
//! El par se usa alrededor de la generación de la rejilla de alimentación:
//! las obstrucciones se agregan antes y se quitan después.
use std::process::Command;

use fab_config::{DeprecatedName, VarKind, Variable};
use fab_core::StepContext;
use fab_domain::DesignFormat;

use crate::tool::{output_path, ToolStep};

fn config_vars() -> Vec<Variable> {
    vec![
        Variable::new(
            "PDN_OBSTRUCTIONS",
            VarKind::Optional(Box::new(VarKind::List(Box::new(VarKind::Str)))),
            "Obstructions applied around power distribution network generation, \
             each as 'layer llx lly urx ury'.",
        )
        .with_deprecated(DeprecatedName::renamed("GRT_OBS")),
        Variable::new(
            "TECH_LEFS",
            VarKind::Optional(Box::new(VarKind::Map(Box::new(VarKind::Path)))),
            "Technology LEF per corner pattern; exactly one must match the \
             default corner.",
        )
        .from_pdk(),
        Variable::new(
            "ODB_UTIL_EXE",
            VarKind::Str,
            "Executable used for database edit subcommands.",
        )
        .with_default(serde_json::json!("odb-util")),
    ]
}

fn build_command(ctx: &StepContext<'_>, subcommand: &str) -> Result<Command, fab_core::StepFailure> {
    let input = ctx.view_in(DesignFormat::Odb)?;
    let exe = ctx.config().str_("ODB_UTIL_EXE").unwrap_or("odb-util");
    let mut command = Command::new(exe);
    command
        .arg(subcommand)
        .arg("--input")
        .arg(input)
        .arg("--output")
        .arg(output_path(ctx, DesignFormat::Odb));
    if let Some(lefs) = ctx.config().get("TECH_LEFS") {
        if !lefs.is_none() {
            let tech_lef = ctx.toolbox().filter_views_exactly_one("tech LEF", lefs)?;
            command.arg("--tech-lef").arg(tech_lef);
        }
    }
    if let Some(items) = ctx.config().list("PDN_OBSTRUCTIONS") {
        for item in items {
            if let Some(obstruction) = item.as_str() {
                command.arg("--obstruction").arg(obstruction);
            }
        }
    }
    Ok(command)
}

fn obstruction_step(id: &'static str, subcommand: &'static str) -> ToolStep {
    ToolStep::new(id, move |ctx| build_command(ctx, subcommand))
        .reads(vec![DesignFormat::Odb])
        .writes(vec![DesignFormat::Odb])
        .with_config_vars(config_vars())
        .skip_unless_truthy("PDN_OBSTRUCTIONS")
        .demoting(&["ORD-0039", "ODB-0220"])
}

pub fn add_pdn_obstructions() -> ToolStep {
    obstruction_step("Odb.AddPDNObstructions", "add_obstructions")
}

pub fn remove_pdn_obstructions() -> ToolStep {
    obstruction_step("Odb.RemovePDNObstructions", "remove_obstructions")
}
