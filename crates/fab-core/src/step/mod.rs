//! Contrato de un step del pipeline.
//!
//! Un step es una unidad idempotente: declara los formatos de diseño que
//! consume y produce, las variables de configuración que reconoce, y expone
//! `run`, que recibe un contexto de sólo lectura y devuelve la porción del
//! `State` que cambió. El step nunca muta el `State` entrante; el ejecutor
//! pliega el update devuelto.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use fab_config::{Config, Variable};
use fab_domain::{DesignFormat, MetricValue, MetricsUpdate, State, ViewsUpdate};

use crate::alert::{Alert, DefaultOutputProcessor, OutputProcessor};
use crate::errors::{StepException, StepFailure};
use crate::toolbox::Toolbox;

pub mod composite;
pub mod exec;

/// Vistas y deltas de métricas producidos por una corrida de step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepUpdate {
    pub views: ViewsUpdate,
    pub metrics: MetricsUpdate,
}

impl StepUpdate {
    pub fn with_view(mut self, format: DesignFormat, path: impl Into<PathBuf>) -> Self {
        self.views.insert(format, path.into());
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: MetricValue) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty() && self.metrics.is_empty()
    }
}

/// Unidad de trabajo del pipeline.
///
/// El identificador (`id`) es estable y con espacio de nombres por familia
/// (`Odb.AddPDNObstructions`); las tablas de gating y sustitución lo
/// referencian textualmente.
pub trait Step: Send + Sync {
    fn id(&self) -> &str;

    /// Nombre legible para logs y manifiestos.
    fn name(&self) -> &str {
        self.id()
    }

    /// Formatos que el step lee del `State`.
    fn inputs(&self) -> Vec<DesignFormat>;

    /// Formatos que el step puede escribir.
    fn outputs(&self) -> Vec<DesignFormat>;

    /// Variables propias del step; participan de la resolución de
    /// configuración del flujo que lo incluye.
    fn config_vars(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Decodificadores de la salida de la herramienta externa.
    fn output_processors(&self) -> Vec<Box<dyn OutputProcessor>> {
        vec![Box::new(DefaultOutputProcessor)]
    }

    /// Hook de reclasificación por alert. Devolver `None` suprime la alert;
    /// el default la deja pasar intacta. Los steps lo usan para degradar
    /// códigos benignos conocidos a advertencia.
    fn on_alert(&self, alert: Alert) -> Option<Alert> {
        Some(alert)
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepUpdate, StepFailure>;
}

/// Contexto de sólo lectura entregado a `Step::run`.
///
/// Las vistas disponibles son únicamente las de los formatos declarados como
/// entrada: leer un formato no declarado es una violación de contrato.
pub struct StepContext<'a> {
    step_id: String,
    config: &'a Config,
    declared_inputs: Vec<DesignFormat>,
    views: IndexMap<DesignFormat, PathBuf>,
    metrics: MetricsUpdate,
    step_dir: PathBuf,
    toolbox: &'a Toolbox,
    interrupt: Arc<AtomicBool>,
}

impl<'a> StepContext<'a> {
    /// Construye el contexto de un step copiando del `State` entrante sólo
    /// las vistas de los formatos declarados.
    pub fn for_step(
        step: &dyn Step,
        config: &'a Config,
        state: &State,
        step_dir: impl Into<PathBuf>,
        toolbox: &'a Toolbox,
    ) -> Self {
        let declared_inputs = step.inputs();
        let mut views = IndexMap::new();
        for format in &declared_inputs {
            if let Some(path) = state.view(*format) {
                views.insert(*format, path.to_path_buf());
            }
        }
        StepContext {
            step_id: step.id().to_string(),
            config,
            declared_inputs,
            views,
            metrics: state.metrics().clone(),
            step_dir: step_dir.into(),
            toolbox,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Comparte la bandera de interrupción del ejecutor.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        self.toolbox
    }

    pub fn step_dir(&self) -> &Path {
        &self.step_dir
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Métrica acumulada hasta este step, si existe.
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    /// Ruta de la vista de entrada `format`.
    ///
    /// El formato debe estar declarado en `inputs()` y presente en el
    /// `State` entrante; ambas violaciones son excepciones de contrato, no
    /// fallos de diseño.
    pub fn view_in(&self, format: DesignFormat) -> Result<&Path, StepException> {
        if !self.declared_inputs.contains(&format) {
            return Err(StepException(format!(
                "step '{}' reads undeclared input format '{}'",
                self.step_id,
                format.id()
            )));
        }
        self.views
            .get(&format)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                StepException(format!(
                    "step '{}' requires a '{}' view but the incoming state has none",
                    self.step_id,
                    format.id()
                ))
            })
    }

    /// Vista de entrada opcional: `None` si el `State` no la trae.
    pub fn view_in_opt(&self, format: DesignFormat) -> Option<&Path> {
        self.views.get(&format).map(PathBuf::as_path)
    }

    /// Copia de las vistas visibles desde este contexto.
    pub fn available_views(&self) -> ViewsUpdate {
        self.views.clone()
    }

    /// Métricas acumuladas hasta este step.
    pub fn all_metrics(&self) -> &MetricsUpdate {
        &self.metrics
    }

    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    pub(crate) fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }
}

/// Forma apta para nombres de directorio de un identificador de step.
pub(crate) fn slug(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Verifica que un update sólo escriba formatos declarados por el step.
///
/// Un formato declarado y no producido es legal (steps condicionales); un
/// formato producido y no declarado rompe el contrato.
pub fn verify_outputs(step_id: &str, outputs: &[DesignFormat], update: &StepUpdate) -> Result<(), StepException> {
    for format in update.views.keys() {
        if !outputs.contains(format) {
            return Err(StepException(format!(
                "step '{step_id}' produced undeclared output format '{}'",
                format.id()
            )));
        }
    }
    Ok(())
}
