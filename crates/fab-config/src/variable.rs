//! Declaración tipada de una variable de configuración.
//!
//! El nombre es un identificador estable e inmutable una vez declarado. Los
//! renombres se expresan con `deprecated_names`: alias viejos que siguen
//! siendo aceptados, opcionalmente con una función de migración que
//! transforma el valor crudo viejo a la forma nueva antes de validar.
use serde_json::Value;

/// Función de migración: valor crudo bajo el alias viejo → valor crudo nuevo.
pub type MigrationFn = fn(Value) -> Value;

/// Alias deprecado de una variable.
#[derive(Debug, Clone)]
pub struct DeprecatedName {
    pub name: &'static str,
    /// `None` significa renombre puro: el valor pasa sin cambios.
    pub migrate: Option<MigrationFn>,
}

impl DeprecatedName {
    pub fn renamed(name: &'static str) -> Self {
        DeprecatedName { name, migrate: None }
    }

    pub fn migrated(name: &'static str, migrate: MigrationFn) -> Self {
        DeprecatedName {
            name,
            migrate: Some(migrate),
        }
    }
}

/// Tipo declarado de una variable. La validación es recursiva para los
/// tipos compuestos: cada elemento debe satisfacer el tipo del elemento.
#[derive(Debug, Clone, PartialEq)]
pub enum VarKind {
    Bool,
    Int,
    Decimal,
    Str,
    Path,
    /// Enumeración de literales permitidos.
    Enum(&'static [&'static str]),
    Optional(Box<VarKind>),
    List(Box<VarKind>),
    /// Mapa string → tipo de elemento (claves con comodines de corner
    /// incluidas; la selección por corner es asunto del Toolbox).
    Map(Box<VarKind>),
    Instance,
    Macro,
    EcoBuffer,
    EcoDiode,
}

impl VarKind {
    /// Descripción corta para mensajes de error.
    pub fn describe(&self) -> String {
        match self {
            VarKind::Bool => "boolean".into(),
            VarKind::Int => "integer".into(),
            VarKind::Decimal => "decimal".into(),
            VarKind::Str => "string".into(),
            VarKind::Path => "path".into(),
            VarKind::Enum(options) => format!("one of {options:?}"),
            VarKind::Optional(inner) => format!("optional {}", inner.describe()),
            VarKind::List(inner) => format!("list of {}", inner.describe()),
            VarKind::Map(inner) => format!("map of {}", inner.describe()),
            VarKind::Instance => "instance record".into(),
            VarKind::Macro => "macro record".into(),
            VarKind::EcoBuffer => "ECO buffer record".into(),
            VarKind::EcoDiode => "ECO diode record".into(),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, VarKind::Optional(_))
    }
}

/// Declaración completa de una variable de configuración.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: &'static str,
    pub kind: VarKind,
    pub description: &'static str,
    /// Default literal, validado contra `kind` durante la resolución.
    pub default: Option<Value>,
    /// Alias viejos, en orden de búsqueda. El primero que aparece gana.
    pub deprecated_names: Vec<DeprecatedName>,
    /// Si es `true`, el default proviene de los datos del PDK y no de un
    /// literal de la declaración.
    pub pdk: bool,
    /// Unidad de despliegue (sólo metadato).
    pub units: Option<&'static str>,
}

impl Variable {
    pub fn new(name: &'static str, kind: VarKind, description: &'static str) -> Self {
        Variable {
            name,
            kind,
            description,
            default: None,
            deprecated_names: Vec::new(),
            pdk: false,
            units: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_deprecated(mut self, alias: DeprecatedName) -> Self {
        self.deprecated_names.push(alias);
        self
    }

    pub fn from_pdk(mut self) -> Self {
        self.pdk = true;
        self
    }

    pub fn with_units(mut self, units: &'static str) -> Self {
        self.units = Some(units);
        self
    }
}
