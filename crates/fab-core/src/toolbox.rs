//! Selección de artefactos por corner de análisis.
//!
//! Los PDKs entregan variantes de un mismo artefacto por corner
//! (`nom_tt_025C_1v80`, `min_ff_n40C_1v95`, ...). Las variables de tipo mapa
//! se indexan por patrón de corner; el Toolbox resuelve qué entradas aplican
//! al corner por defecto de la corrida.
use std::path::PathBuf;

use fab_config::{Config, VarValue};

use crate::errors::StepException;
use crate::pattern::glob_match;

/// Ayudante compartido de sólo lectura entre steps de una corrida.
#[derive(Debug, Clone)]
pub struct Toolbox {
    default_corner: String,
}

impl Toolbox {
    pub fn new(default_corner: impl Into<String>) -> Self {
        Toolbox {
            default_corner: default_corner.into(),
        }
    }

    /// Construye el Toolbox desde la variable `DEFAULT_CORNER`.
    pub fn from_config(config: &Config) -> Self {
        let corner = config
            .str_("DEFAULT_CORNER")
            .unwrap_or("nom_tt_025C_1v80")
            .to_string();
        Toolbox::new(corner)
    }

    pub fn default_corner(&self) -> &str {
        &self.default_corner
    }

    /// Filtra un mapa patrón-de-corner → rutas, conservando las entradas
    /// cuyo patrón empareja con el corner por defecto. El orden de
    /// declaración del mapa se preserva.
    pub fn filter_views(&self, views_by_corner: &VarValue) -> Vec<PathBuf> {
        let mut selected = Vec::new();
        let Some(map) = views_by_corner.as_map() else {
            return selected;
        };
        for (corner_pattern, value) in map {
            if !glob_match(corner_pattern, &self.default_corner) {
                continue;
            }
            match value {
                VarValue::Path(p) => selected.push(p.clone()),
                VarValue::List(items) => {
                    for item in items {
                        if let VarValue::Path(p) = item {
                            selected.push(p.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        selected
    }

    /// Como [`filter_views`](Self::filter_views), pero exige exactamente un
    /// artefacto para el corner por defecto.
    pub fn filter_views_exactly_one(
        &self,
        what: &str,
        views_by_corner: &VarValue,
    ) -> Result<PathBuf, StepException> {
        let mut selected = self.filter_views(views_by_corner);
        match selected.len() {
            1 => Ok(selected.remove(0)),
            0 => Err(StepException(format!(
                "no {what} matches the default corner '{}'",
                self.default_corner
            ))),
            n => Err(StepException(format!(
                "expected exactly one {what} for the default corner '{}', found {n}",
                self.default_corner
            ))),
        }
    }
}
