//! Ejecutor secuencial: la única estrategia de ejecución del motor.
//!
//! Camina la lista final de steps en orden, aplica el gating, enhebra el
//! `State` y persiste un snapshot numerado por step ejecutado más un
//! manifiesto de corrida (`flow_run.json`). Un step fallido detiene el
//! flujo de inmediato; todo el `State` previo queda intacto para el
//! postmortem. Una corrida nueva puede sembrarse desde el último snapshot
//! persistido de una corrida anterior.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fab_config::{resolve, Config, VarKind, Variable};
use fab_domain::{State, ViewsUpdate};

use crate::errors::{FlowError, StepFailure};
use crate::flow::FlowDefinition;
use crate::metrics::aggregate_metrics;
use crate::step::{slug, verify_outputs, Step, StepContext};
use crate::toolbox::Toolbox;

/// Snapshot persistido dentro del directorio de cada step ejecutado.
pub const STATE_FILE: &str = "state_out.json";
/// Manifiesto de la corrida en la raíz del directorio de corrida.
pub const MANIFEST_FILE: &str = "flow_run.json";

/// Variables reconocidas por todo flujo, antes de las propias.
fn builtin_vars() -> Vec<Variable> {
    vec![
        Variable::new("DESIGN_NAME", VarKind::Str, "Name of the top module."),
        Variable::new(
            "DEFAULT_CORNER",
            VarKind::Str,
            "Process corner used when exactly one artifact variant must be chosen.",
        )
        .with_default(serde_json::json!("nom_tt_025C_1v80")),
    ]
}

/// Veredicto de un step dentro de la corrida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// No corrió: la variable de gating indicada no es verdadera.
    Skipped { gate: String },
    Failed { recoverable: bool, message: String },
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowStatus {
    Completed,
    Failed { step_id: String },
    Interrupted { step_id: String },
}

/// Salida de una corrida: estado final, veredicto y bitácora ordenada.
#[derive(Debug)]
pub struct FlowResult {
    pub status: FlowStatus,
    pub state: State,
    pub records: Vec<StepRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunManifest {
    flow: String,
    design: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: FlowStatus,
    records: Vec<StepRecord>,
}

pub struct SequentialFlow {
    definition: FlowDefinition,
    steps: Vec<Box<dyn Step>>,
    config: Config,
    toolbox: Toolbox,
    run_dir: PathBuf,
    interrupt: Arc<AtomicBool>,
}

impl std::fmt::Debug for SequentialFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialFlow").finish_non_exhaustive()
    }
}

impl SequentialFlow {
    /// Instancia los steps finales y resuelve la configuración una única
    /// vez: variables built-in, del flujo y de cada step instanciado, en
    /// ese orden (la primera declaración de un nombre gana).
    pub fn new(
        definition: FlowDefinition,
        user: &IndexMap<String, Value>,
        pdk_defaults: &IndexMap<String, Value>,
        run_dir: impl Into<PathBuf>,
    ) -> Result<Self, FlowError> {
        let steps = definition.instantiate_steps()?;

        let mut variables = builtin_vars();
        for var in definition
            .config_vars
            .iter()
            .cloned()
            .chain(steps.iter().flat_map(|s| s.config_vars()))
        {
            if !variables.iter().any(|v| v.name == var.name) {
                variables.push(var);
            }
        }
        let config = resolve(&variables, user, pdk_defaults)?;
        let toolbox = Toolbox::from_config(&config);

        Ok(SequentialFlow {
            definition,
            steps,
            config,
            toolbox,
            run_dir: run_dir.into(),
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bandera compartida: ponerla en `true` interrumpe la corrida en el
    /// siguiente límite de step y termina el subproceso en vuelo.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Último snapshot persistido de una corrida anterior, si existe.
    /// Permite sembrar el `State` inicial de una corrida nueva.
    pub fn latest_snapshot(run_dir: &Path) -> Result<Option<State>, FlowError> {
        let entries = match fs::read_dir(run_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut step_dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        // orden por el prefijo numérico, no lexicográfico: "100-" va
        // después de "99-"
        step_dirs.sort_by_key(|path| (step_number(path), path.clone()));
        for dir in step_dirs.into_iter().rev() {
            let snapshot = dir.join(STATE_FILE);
            if snapshot.is_file() {
                return Ok(Some(State::load(&snapshot)?));
            }
        }
        Ok(None)
    }

    /// Corre el flujo completo desde `initial`.
    ///
    /// Los fallos de step no son un `Err`: quedan en el `FlowStatus` y la
    /// bitácora. `Err` se reserva para problemas externos a los steps
    /// (E/S del directorio de corrida, manifiesto).
    pub fn run(&self, initial: State) -> Result<FlowResult, FlowError> {
        fs::create_dir_all(&self.run_dir)?;
        let started_at = Utc::now();
        log::info!(
            "flow '{}': {} steps, run directory {}",
            self.definition.name,
            self.steps.len(),
            self.run_dir.display()
        );

        let mut state = initial;
        let mut records = Vec::with_capacity(self.steps.len());
        let mut status = FlowStatus::Completed;
        let total = self.steps.len();

        for (index, step) in self.steps.iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                records.push(record(step.as_ref(), StepStatus::Interrupted));
                status = FlowStatus::Interrupted {
                    step_id: step.id().to_string(),
                };
                break;
            }

            if let Some(gate) = self.closed_gate(step.id()) {
                log::info!(
                    "[{}/{total}] {} skipped ('{gate}' is not set)",
                    index + 1,
                    step.name()
                );
                records.push(record(step.as_ref(), StepStatus::Skipped { gate }));
                continue;
            }

            let step_dir = self
                .run_dir
                .join(format!("{:02}-{}", index + 1, slug(step.id())));
            log::info!("[{}/{total}] {} [{}]", index + 1, step.name(), step.id());

            let ctx = StepContext::for_step(step.as_ref(), &self.config, &state, &step_dir, &self.toolbox)
                .with_interrupt(Arc::clone(&self.interrupt));
            let outcome = step.run(&ctx).and_then(|update| {
                verify_outputs(step.id(), &step.outputs(), &update)?;
                Ok(update)
            });

            match outcome {
                Ok(update) => {
                    state = state.fold(&update.views, &update.metrics);
                    // los agregados derivados se recalculan sobre el
                    // conjunto fusionado, no sobre el delta
                    let aggregated = aggregate_metrics(state.metrics());
                    state = state.fold(&ViewsUpdate::new(), &aggregated);

                    fs::create_dir_all(&step_dir)?;
                    state.save(&step_dir.join(STATE_FILE))?;
                    records.push(record(step.as_ref(), StepStatus::Completed));
                }
                Err(StepFailure::Interrupted(_)) => {
                    log::warn!("'{}' interrupted", step.id());
                    records.push(record(step.as_ref(), StepStatus::Interrupted));
                    status = FlowStatus::Interrupted {
                        step_id: step.id().to_string(),
                    };
                    break;
                }
                Err(failure) => {
                    log::error!("{failure}");
                    records.push(record(
                        step.as_ref(),
                        StepStatus::Failed {
                            recoverable: failure.is_recoverable(),
                            message: failure.to_string(),
                        },
                    ));
                    status = FlowStatus::Failed {
                        step_id: step.id().to_string(),
                    };
                    break;
                }
            }
        }

        let manifest = RunManifest {
            flow: self.definition.name.clone(),
            design: self.config.str_("DESIGN_NAME").map(str::to_string),
            started_at,
            finished_at: Utc::now(),
            status: status.clone(),
            records: records.clone(),
        };
        let serialized = serde_json::to_string_pretty(&manifest)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.run_dir.join(MANIFEST_FILE), serialized)?;

        match &status {
            FlowStatus::Completed => log::info!("flow '{}' completed", self.definition.name),
            FlowStatus::Failed { step_id } => {
                log::error!("flow '{}' failed at '{step_id}'", self.definition.name)
            }
            FlowStatus::Interrupted { step_id } => {
                log::warn!("flow '{}' interrupted at '{step_id}'", self.definition.name)
            }
        }

        Ok(FlowResult {
            status,
            state,
            records,
        })
    }

    /// Primera variable de gating no verdadera, si el step está gateado.
    fn closed_gate(&self, step_id: &str) -> Option<String> {
        self.definition
            .gate_vars(step_id)
            .iter()
            .find(|var| !self.config.truthy(var))
            .cloned()
    }
}

/// Prefijo numérico de un directorio de step (`07-...`, `100-...`).
fn step_number(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .split('-')
        .next()?
        .parse()
        .ok()
}

fn record(step: &dyn Step, status: StepStatus) -> StepRecord {
    StepRecord {
        step_id: step.id().to_string(),
        name: step.name().to_string(),
        status,
    }
}
