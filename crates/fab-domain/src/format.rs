//! Enumeración cerrada de clases de artefacto de diseño.
//!
//! Cada miembro tiene un identificador estable (usado en líneas de comando y
//! serialización) y una extensión de archivo. Los steps sólo pueden leer y
//! escribir formatos de esta enumeración; nunca inventan clases ad hoc.
use serde::{Deserialize, Serialize};

/// Clase de artefacto de diseño producido o consumido por un step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesignFormat {
    #[serde(rename = "nl")]
    Netlist,
    #[serde(rename = "pnl")]
    PoweredNetlist,
    #[serde(rename = "json_h")]
    JsonHeader,
    #[serde(rename = "vh")]
    VerilogHeader,
    #[serde(rename = "odb")]
    Odb,
    #[serde(rename = "def")]
    Def,
    #[serde(rename = "lef")]
    Lef,
    #[serde(rename = "sdc")]
    Sdc,
    #[serde(rename = "spef")]
    Spef,
    #[serde(rename = "spice")]
    Spice,
    #[serde(rename = "mag")]
    Mag,
    #[serde(rename = "gds")]
    Gds,
    #[serde(rename = "lib")]
    Lib,
}

impl DesignFormat {
    /// Identificador estable (coincide con la forma serializada).
    pub fn id(&self) -> &'static str {
        match self {
            DesignFormat::Netlist => "nl",
            DesignFormat::PoweredNetlist => "pnl",
            DesignFormat::JsonHeader => "json_h",
            DesignFormat::VerilogHeader => "vh",
            DesignFormat::Odb => "odb",
            DesignFormat::Def => "def",
            DesignFormat::Lef => "lef",
            DesignFormat::Sdc => "sdc",
            DesignFormat::Spef => "spef",
            DesignFormat::Spice => "spice",
            DesignFormat::Mag => "mag",
            DesignFormat::Gds => "gds",
            DesignFormat::Lib => "lib",
        }
    }

    /// Extensión de archivo convencional para vistas de este formato.
    pub fn extension(&self) -> &'static str {
        match self {
            DesignFormat::Netlist => "nl.v",
            DesignFormat::PoweredNetlist => "pnl.v",
            DesignFormat::JsonHeader => "h.json",
            DesignFormat::VerilogHeader => "vh",
            DesignFormat::Odb => "odb",
            DesignFormat::Def => "def",
            DesignFormat::Lef => "lef",
            DesignFormat::Sdc => "sdc",
            DesignFormat::Spef => "spef",
            DesignFormat::Spice => "spice",
            DesignFormat::Mag => "mag",
            DesignFormat::Gds => "gds",
            DesignFormat::Lib => "lib",
        }
    }

    /// Nombre legible para reportes.
    pub fn full_name(&self) -> &'static str {
        match self {
            DesignFormat::Netlist => "Verilog Netlist",
            DesignFormat::PoweredNetlist => "Powered Verilog Netlist",
            DesignFormat::JsonHeader => "JSON Design Header",
            DesignFormat::VerilogHeader => "Verilog Header",
            DesignFormat::Odb => "OpenDB Database",
            DesignFormat::Def => "Design Exchange Format",
            DesignFormat::Lef => "Library Exchange Format",
            DesignFormat::Sdc => "Design Constraints",
            DesignFormat::Spef => "Extracted Parasitics",
            DesignFormat::Spice => "SPICE Netlist",
            DesignFormat::Mag => "Magic View",
            DesignFormat::Gds => "GDSII Stream",
            DesignFormat::Lib => "Liberty Timing Library",
        }
    }

    /// Todos los miembros, en orden de declaración.
    pub fn all() -> &'static [DesignFormat] {
        &[
            DesignFormat::Netlist,
            DesignFormat::PoweredNetlist,
            DesignFormat::JsonHeader,
            DesignFormat::VerilogHeader,
            DesignFormat::Odb,
            DesignFormat::Def,
            DesignFormat::Lef,
            DesignFormat::Sdc,
            DesignFormat::Spef,
            DesignFormat::Spice,
            DesignFormat::Mag,
            DesignFormat::Gds,
            DesignFormat::Lib,
        ]
    }

    /// Búsqueda inversa por identificador estable.
    pub fn by_id(id: &str) -> Option<DesignFormat> {
        DesignFormat::all().iter().copied().find(|f| f.id() == id)
    }
}

impl std::fmt::Display for DesignFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_stable() {
        let mut seen = std::collections::HashSet::new();
        for format in DesignFormat::all() {
            assert!(seen.insert(format.id()), "id duplicado: {}", format.id());
            assert_eq!(DesignFormat::by_id(format.id()), Some(*format));
        }
    }

    #[test]
    fn serde_uses_stable_id() {
        let json = serde_json::to_string(&DesignFormat::Odb).unwrap();
        assert_eq!(json, "\"odb\"");
        let back: DesignFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DesignFormat::Odb);
    }
}
