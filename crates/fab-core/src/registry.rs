//! Registros con nombre a nivel de proceso.
//!
//! Las tablas de sustitución y gating referencian steps por identificador
//! estable; el registro resuelve identificador → fábrica en O(1). El
//! registro se puebla durante la inicialización y la registración es
//! idempotente por identificador (la primera fábrica gana).
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::flow::FlowDefinition;
use crate::step::Step;

/// Fábrica de steps: cada corrida instancia steps frescos.
pub type StepFactory = Arc<dyn Fn() -> Box<dyn Step> + Send + Sync>;

/// Registro genérico nombre → valor clonable.
pub struct Registry<T: Clone> {
    label: &'static str,
    inner: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Registry<T> {
    pub fn new(label: &'static str) -> Self {
        Registry {
            label,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Registra `value` bajo `id`. Idempotente: registrar un id ya presente
    /// conserva el valor original y no es un error.
    pub fn register(&self, id: &str, value: T) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        if map.contains_key(id) {
            log::debug!("{} '{}' already registered, keeping first", self.label, id);
            return;
        }
        map.insert(id.to_string(), value);
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

static STEPS: Lazy<Registry<StepFactory>> = Lazy::new(|| Registry::new("step"));
static FLOWS: Lazy<Registry<Arc<FlowDefinition>>> = Lazy::new(|| Registry::new("flow"));

/// Registro global de steps.
pub fn step_registry() -> &'static Registry<StepFactory> {
    &STEPS
}

/// Registro global de definiciones de flujo.
pub fn flow_registry() -> &'static Registry<Arc<FlowDefinition>> {
    &FLOWS
}

/// Azúcar para registrar una fábrica de step.
pub fn register_step<F>(id: &str, factory: F)
where
    F: Fn() -> Box<dyn Step> + Send + Sync + 'static,
{
    step_registry().register(id, Arc::new(factory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_per_id() {
        let registry: Registry<u32> = Registry::new("test");
        registry.register("a", 1);
        registry.register("a", 2);
        registry.register("b", 2);
        assert_eq!(registry.get("a"), Some(1));
        assert_eq!(registry.get("b"), Some(2));
        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(!registry.contains("c"));
    }
}
