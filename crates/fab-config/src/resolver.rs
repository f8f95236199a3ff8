//! Resolución de variables: entrada cruda + defaults de PDK → `Config`.
//!
//! Orden de búsqueda por variable:
//! 1. Nombre actual en la entrada cruda.
//! 2. Alias deprecados, en orden; el primero que aparece gana y, si el alias
//!    lleva función de migración, se aplica antes de validar.
//! 3. Default del PDK (sólo variables `pdk = true`).
//! 4. Default literal de la declaración.
//! 5. `None` explícito para tipos opcionales.
//! Si nada aplica, la resolución completa falla (todo o nada).
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::Config;
use crate::error::ConfigError;
use crate::value::{validate, VarValue};
use crate::variable::Variable;

/// Resuelve el conjunto declarado contra la entrada del usuario.
///
/// Efecto lateral: el uso de un alias deprecado emite una advertencia no
/// fatal para guiar la migración.
pub fn resolve(
    variables: &[Variable],
    user: &IndexMap<String, Value>,
    pdk_defaults: &IndexMap<String, Value>,
) -> Result<Config, ConfigError> {
    let mut resolved: IndexMap<String, VarValue> = IndexMap::with_capacity(variables.len());

    for variable in variables {
        let value = resolve_one(variable, user, pdk_defaults)?;
        resolved.insert(variable.name.to_string(), value);
    }

    Ok(Config::new(resolved))
}

fn resolve_one(
    variable: &Variable,
    user: &IndexMap<String, Value>,
    pdk_defaults: &IndexMap<String, Value>,
) -> Result<VarValue, ConfigError> {
    if let Some(raw) = user.get(variable.name) {
        return validate(variable.name, &variable.kind, raw);
    }

    for alias in &variable.deprecated_names {
        if let Some(raw) = user.get(alias.name) {
            log::warn!(
                "the variable '{}' was renamed to '{}'; please update your configuration",
                alias.name,
                variable.name
            );
            let migrated = match alias.migrate {
                Some(migrate) => migrate(raw.clone()),
                None => raw.clone(),
            };
            return validate(variable.name, &variable.kind, &migrated);
        }
    }

    if variable.pdk {
        if let Some(raw) = pdk_defaults.get(variable.name) {
            return validate(variable.name, &variable.kind, raw);
        }
    }

    if let Some(default) = &variable.default {
        return validate(variable.name, &variable.kind, default).map_err(|source| {
            ConfigError::BadDefault {
                name: variable.name.to_string(),
                source: Box::new(source),
            }
        });
    }

    if variable.kind.is_optional() {
        return Ok(VarValue::None);
    }

    Err(ConfigError::Missing {
        name: variable.name.to_string(),
    })
}
