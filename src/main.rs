//! Binario de demostración: corre un flujo registrado contra una
//! configuración JSON.
//!
//! Uso:
//!
//! ```text
//! main-core <flujo> <config.json> <directorio-de-corrida> [--resume]
//! ```
//!
//! La configuración es un objeto JSON plano nombre → valor. Con `--resume`
//! el estado inicial se siembra desde el último snapshot persistido en el
//! directorio de corrida.
use std::process::ExitCode;

use indexmap::IndexMap;
use serde_json::Value;

use fab_core::{flow_registry, FlowError, FlowStatus, SequentialFlow};
use fab_domain::State;
use fabflow_rust::flows;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <flow> <config.json> <run-dir> [--resume]", args[0]);
        return Ok(false);
    }
    let flow_name = &args[1];
    let config_path = &args[2];
    let run_dir = &args[3];
    let resume = args.iter().any(|a| a == "--resume");

    flows::register_flows();
    let definition = flow_registry()
        .get(flow_name)
        .ok_or_else(|| FlowError::UnknownFlow(flow_name.clone()))?;

    let raw = std::fs::read_to_string(config_path)?;
    let user: IndexMap<String, Value> = serde_json::from_str(&raw)?;

    let initial = if resume {
        SequentialFlow::latest_snapshot(std::path::Path::new(run_dir))?.unwrap_or_default()
    } else {
        State::new()
    };

    let flow = SequentialFlow::new((*definition).clone(), &user, &IndexMap::new(), run_dir)?;
    let result = flow.run(initial)?;

    for record in &result.records {
        log::info!("{:<40} {:?}", record.step_id, record.status);
    }
    for (name, value) in result.state.metrics() {
        log::info!("metric {name} = {value}");
    }

    Ok(matches!(result.status, FlowStatus::Completed))
}
