//! Step genérico sobre una herramienta externa.
//!
//! `ToolStep` arma la línea de comando con un constructor provisto por el
//! step concreto, corre el subproceso por la frontera de fab-core y
//! descubre las vistas producidas por convención de nombres: cada formato
//! declarado como salida se busca como `<design>.<ext>` dentro del
//! directorio del step. Un formato declarado y no escrito por la
//! herramienta simplemente no aparece en el update.
use std::path::PathBuf;
use std::process::Command;

use fab_config::{Config, Variable};
use fab_core::step::exec::run_subprocess;
use fab_core::{Alert, AlertClass, Step, StepContext, StepFailure, StepUpdate};
use fab_domain::DesignFormat;

pub type CommandBuilder =
    Box<dyn Fn(&StepContext<'_>) -> Result<Command, StepFailure> + Send + Sync>;

/// Precondición de corrida: devolver `Some(razón)` salta el step sin
/// invocar la herramienta (el update es vacío y el flujo sigue).
pub type Precondition = Box<dyn Fn(&Config) -> Option<String> + Send + Sync>;

pub struct ToolStep {
    id: String,
    name: String,
    inputs: Vec<DesignFormat>,
    outputs: Vec<DesignFormat>,
    config_vars: Vec<Variable>,
    precondition: Option<Precondition>,
    demote: Vec<String>,
    builder: CommandBuilder,
}

impl ToolStep {
    pub fn new(
        id: impl Into<String>,
        builder: impl Fn(&StepContext<'_>) -> Result<Command, StepFailure> + Send + Sync + 'static,
    ) -> Self {
        let id = id.into();
        ToolStep {
            name: id.clone(),
            id,
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_vars: Vec::new(),
            precondition: None,
            demote: Vec::new(),
            builder: Box::new(builder),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn reads(mut self, formats: Vec<DesignFormat>) -> Self {
        self.inputs = formats;
        self
    }

    pub fn writes(mut self, formats: Vec<DesignFormat>) -> Self {
        self.outputs = formats;
        self
    }

    pub fn with_config_vars(mut self, vars: Vec<Variable>) -> Self {
        self.config_vars = vars;
        self
    }

    /// Precondición usual: la variable debe ser verdadera para correr.
    pub fn skip_unless_truthy(self, var: &'static str) -> Self {
        self.skip_when(move |config| {
            if config.truthy(var) {
                None
            } else {
                Some(format!("'{var}' is not set"))
            }
        })
    }

    pub fn skip_when(
        mut self,
        precondition: impl Fn(&Config) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.precondition = Some(Box::new(precondition));
        self
    }

    /// Códigos de alert degradados a advertencia por `on_alert`.
    pub fn demoting(mut self, codes: &[&str]) -> Self {
        self.demote = codes.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Destino canónico de la vista `format` dentro del directorio del step.
pub fn output_path(ctx: &StepContext<'_>, format: DesignFormat) -> PathBuf {
    let design = ctx.config().str_("DESIGN_NAME").unwrap_or("design");
    ctx.step_dir()
        .join(format!("{design}.{}", format.extension()))
}

impl Step for ToolStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<DesignFormat> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<DesignFormat> {
        self.outputs.clone()
    }

    fn config_vars(&self) -> Vec<Variable> {
        self.config_vars.clone()
    }

    fn on_alert(&self, alert: Alert) -> Option<Alert> {
        if self.demote.iter().any(|code| *code == alert.code) {
            Some(alert.reclassified(AlertClass::Warning))
        } else {
            Some(alert)
        }
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepUpdate, StepFailure> {
        if let Some(precondition) = &self.precondition {
            if let Some(reason) = precondition(ctx.config()) {
                log::info!("'{}' skipped: {reason}", self.id);
                return Ok(StepUpdate::default());
            }
        }

        let command = (self.builder)(ctx)?;
        let outcome = run_subprocess(self, ctx, command)?;

        let mut update = StepUpdate::default();
        update.metrics = outcome.metrics;
        for format in &self.outputs {
            let candidate = output_path(ctx, *format);
            if candidate.is_file() {
                update.views.insert(*format, candidate);
            }
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fab_core::Toolbox;
    use fab_domain::{MetricValue, State};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn run_step(step: &ToolStep, config: &Config) -> Result<StepUpdate, StepFailure> {
        let dir = tempfile::tempdir().unwrap();
        let toolbox = Toolbox::new("nom");
        let state = State::new();
        let ctx = StepContext::for_step(step, config, &state, dir.path().join("step"), &toolbox);
        step.run(&ctx)
    }

    #[test]
    fn unmet_precondition_skips_without_spawning() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&spawned);
        let step = ToolStep::new("Test.Gated", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Command::new("false"))
        })
        .skip_unless_truthy("RUN_GATED");

        let update = run_step(&step, &Config::default()).unwrap();
        assert!(update.is_empty());
        assert_eq!(spawned.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn produced_views_are_discovered_by_convention() {
        let step = ToolStep::new("Test.WriteDef", |ctx| {
            let mut command = Command::new("/bin/sh");
            command.arg("-c").arg(format!(
                "printf 'DESIGN x ;' > '{}'",
                output_path(ctx, DesignFormat::Def).display()
            ));
            Ok(command)
        })
        .writes(vec![DesignFormat::Def, DesignFormat::Odb]);

        let update = run_step(&step, &Config::default()).unwrap();
        // sólo el formato realmente escrito aparece
        assert_eq!(update.views.len(), 1);
        assert!(update.views.contains_key(&DesignFormat::Def));
    }

    #[test]
    fn metrics_flow_through_from_the_tool() {
        let step = ToolStep::new("Test.Metrics", |ctx| {
            let mut command = Command::new("/bin/sh");
            command.arg("-c").arg(format!(
                r#"printf '{{"design__area": 12.5}}' > '{}'"#,
                ctx.step_dir().join("metrics_out.json").display()
            ));
            Ok(command)
        });

        let update = run_step(&step, &Config::default()).unwrap();
        assert!(matches!(
            update.metrics.get("design__area"),
            Some(MetricValue::Decimal(_))
        ));
    }

    #[test]
    fn demoted_codes_do_not_fail_the_step() {
        let step = ToolStep::new("Test.Demote", |_| {
            let mut command = Command::new("/bin/sh");
            command.arg("-c").arg("echo '[ERROR ODB-0220] obsolete construct'");
            Ok(command)
        })
        .demoting(&["ODB-0220"]);
        assert!(run_step(&step, &Config::default()).is_ok());

        let strict = ToolStep::new("Test.Strict", |_| {
            let mut command = Command::new("/bin/sh");
            command.arg("-c").arg("echo '[ERROR ODB-0220] obsolete construct'");
            Ok(command)
        });
        assert!(run_step(&strict, &Config::default()).is_err());
    }
}
