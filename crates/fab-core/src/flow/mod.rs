//! Definición declarativa de un flujo.
//!
//! Un flujo declara la lista ordenada de identificadores de step, sus
//! variables propias, la tabla de gating (step → variables que deben ser
//! verdaderas para correrlo) y una tabla ordenada de sustituciones por
//! patrón. Las variantes de un flujo se expresan derivando la definición
//! base y agregando sustituciones, no copiando la lista de steps.
use indexmap::IndexMap;

use fab_config::Variable;

use crate::errors::FlowError;
use crate::pattern::glob_match;
use crate::registry::step_registry;
use crate::step::Step;

pub mod sequential;

/// Regla de sustitución: `replacement = None` elimina los steps que
/// emparejan; `Some(id)` los reemplaza por el step registrado bajo `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: String,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowDefinition {
    pub name: String,
    /// Identificadores de step registrados, en orden de ejecución.
    pub steps: Vec<String>,
    /// Variables propias del flujo (las de cada step se suman aparte).
    pub config_vars: Vec<Variable>,
    /// step id → variables que deben ser todas verdaderas para correrlo.
    pub gates: IndexMap<String, Vec<String>>,
    /// Reglas aplicadas en orden de declaración sobre la lista de steps.
    pub substitutions: Vec<Substitution>,
}

impl FlowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<&str>) -> Self {
        FlowDefinition {
            name: name.into(),
            steps: steps.into_iter().map(str::to_string).collect(),
            ..Default::default()
        }
    }

    pub fn with_config_vars(mut self, vars: Vec<Variable>) -> Self {
        self.config_vars = vars;
        self
    }

    pub fn with_gate(mut self, step_id: &str, vars: Vec<&str>) -> Self {
        self.gates
            .insert(step_id.to_string(), vars.into_iter().map(str::to_string).collect());
        self
    }

    pub fn with_substitution(mut self, pattern: &str, replacement: Option<&str>) -> Self {
        self.substitutions.push(Substitution {
            pattern: pattern.to_string(),
            replacement: replacement.map(str::to_string),
        });
        self
    }

    /// Variante derivada: misma lista, mismas tablas, otro nombre. Las
    /// sustituciones adicionales se agregan sobre la definición derivada.
    pub fn derive(&self, name: impl Into<String>) -> FlowDefinition {
        let mut derived = self.clone();
        derived.name = name.into();
        derived
    }

    /// Variables de gating de un step (vacío si no está gateado).
    pub fn gate_vars(&self, step_id: &str) -> &[String] {
        self.gates
            .get(step_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lista final de identificadores tras aplicar las sustituciones en
    /// orden. Un patrón que no empareja con ningún step de la lista vigente
    /// es un error de definición.
    pub fn resolved_step_ids(&self) -> Result<Vec<String>, FlowError> {
        let mut ids = self.steps.clone();
        for substitution in &self.substitutions {
            let mut matched = false;
            let mut next = Vec::with_capacity(ids.len());
            for id in ids {
                if glob_match(&substitution.pattern, &id) {
                    matched = true;
                    if let Some(replacement) = &substitution.replacement {
                        next.push(replacement.clone());
                    }
                } else {
                    next.push(id);
                }
            }
            if !matched {
                return Err(FlowError::UselessSubstitution {
                    flow: self.name.clone(),
                    pattern: substitution.pattern.clone(),
                });
            }
            ids = next;
        }
        Ok(ids)
    }

    /// Instancia los steps finales desde el registro global.
    pub fn instantiate_steps(&self) -> Result<Vec<Box<dyn Step>>, FlowError> {
        let mut steps = Vec::new();
        for id in self.resolved_step_ids()? {
            let factory = step_registry()
                .get(&id)
                .ok_or_else(|| FlowError::UnknownStep {
                    flow: self.name.clone(),
                    step: id.clone(),
                })?;
            steps.push(factory());
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> FlowDefinition {
        FlowDefinition::new(
            "Classic",
            vec![
                "Checker.LintErrors",
                "Checker.LintWarnings",
                "Synth.Elaborate",
                "Place.Global",
            ],
        )
    }

    #[test]
    fn removal_drops_every_match() {
        let flow = base().with_substitution("Checker.Lint*", None);
        assert_eq!(
            flow.resolved_step_ids().unwrap(),
            vec!["Synth.Elaborate", "Place.Global"]
        );
    }

    #[test]
    fn replacement_is_positional() {
        let flow = base().with_substitution("Synth.Elaborate", Some("Synth.VhdlElaborate"));
        assert_eq!(
            flow.resolved_step_ids().unwrap(),
            vec![
                "Checker.LintErrors",
                "Checker.LintWarnings",
                "Synth.VhdlElaborate",
                "Place.Global"
            ]
        );
    }

    #[test]
    fn substitutions_apply_in_declaration_order() {
        let flow = base()
            .with_substitution("Checker.LintWarnings", Some("Checker.Relint"))
            .with_substitution("Checker.*", None);
        // la segunda regla también elimina el reemplazo de la primera
        assert_eq!(
            flow.resolved_step_ids().unwrap(),
            vec!["Synth.Elaborate", "Place.Global"]
        );
    }

    #[test]
    fn useless_pattern_is_a_definition_error() {
        let flow = base().with_substitution("Route.*", None);
        let err = flow.resolved_step_ids().unwrap_err();
        assert!(matches!(
            err,
            FlowError::UselessSubstitution { pattern, .. } if pattern == "Route.*"
        ));
    }

    #[test]
    fn derivation_keeps_the_base_untouched() {
        let classic = base();
        let vhdl = classic
            .derive("VHDLClassic")
            .with_substitution("Checker.Lint*", None);
        assert_eq!(classic.substitutions.len(), 0);
        assert_eq!(vhdl.name, "VHDLClassic");
        assert_eq!(vhdl.steps, classic.steps);
    }
}
