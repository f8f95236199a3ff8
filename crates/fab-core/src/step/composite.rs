//! Steps compuestos: una sub-secuencia ordenada expuesta como un step.
//!
//! El compuesto enhebra un estado local por sus sub-steps y fusiona los
//! updates; hacia afuera es atómico: o todos los sub-steps terminan y el
//! update combinado se pliega de una vez, o el primero que falla aborta el
//! compuesto y no se pliega nada.
use fab_config::Variable;
use fab_domain::{DesignFormat, State};

use crate::errors::StepFailure;
use crate::step::{slug, verify_outputs, Step, StepContext, StepUpdate};

pub struct CompositeStep {
    id: String,
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl CompositeStep {
    pub fn new(id: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        let id = id.into();
        CompositeStep {
            name: id.clone(),
            id,
            steps,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn sub_steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }
}

impl Step for CompositeStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Unión de las entradas de los sub-steps, menos los formatos que un
    /// sub-step anterior ya produce dentro del compuesto.
    fn inputs(&self) -> Vec<DesignFormat> {
        let mut produced = Vec::new();
        let mut required = Vec::new();
        for step in &self.steps {
            for format in step.inputs() {
                if !produced.contains(&format) && !required.contains(&format) {
                    required.push(format);
                }
            }
            for format in step.outputs() {
                if !produced.contains(&format) {
                    produced.push(format);
                }
            }
        }
        required
    }

    fn outputs(&self) -> Vec<DesignFormat> {
        let mut outputs = Vec::new();
        for step in &self.steps {
            for format in step.outputs() {
                if !outputs.contains(&format) {
                    outputs.push(format);
                }
            }
        }
        outputs
    }

    fn config_vars(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::new();
        for step in &self.steps {
            for var in step.config_vars() {
                if !vars.iter().any(|v| v.name == var.name) {
                    vars.push(var);
                }
            }
        }
        vars
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepUpdate, StepFailure> {
        let mut local =
            State::with_views(ctx.available_views()).fold(&Default::default(), ctx.all_metrics());
        let mut combined = StepUpdate::default();

        for (index, step) in self.steps.iter().enumerate() {
            if ctx.interrupted() {
                return Err(StepFailure::Interrupted(self.id.clone()));
            }
            let sub_dir = ctx
                .step_dir()
                .join(format!("{}-{}", index + 1, slug(step.id())));
            let sub_ctx =
                StepContext::for_step(step.as_ref(), ctx.config(), &local, sub_dir, ctx.toolbox())
                    .with_interrupt(ctx.interrupt_flag());
            log::info!("  - {} [{}]", step.name(), step.id());
            let update = step.run(&sub_ctx)?;
            verify_outputs(step.id(), &step.outputs(), &update)?;
            local = local.fold(&update.views, &update.metrics);
            combined.views.extend(update.views);
            combined.metrics.extend(update.metrics);
        }
        Ok(combined)
    }
}
