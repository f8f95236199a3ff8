//! Emparejamiento de patrones estilo glob sobre identificadores.
//!
//! Usado por las tablas de sustitución de flujos (`Checker.Lint*`) y por la
//! selección de corner del Toolbox (`nom_*`). Sólo se soporta `*` como
//! comodín de cero o más caracteres; no hay clases ni `?`.

/// `true` si `candidate` satisface `pattern`.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let mut rest = candidate;

    // el primer segmento ancla al inicio, el último al final
    let first = segments[0];
    if !rest.starts_with(first) {
        return false;
    }
    rest = &rest[first.len()..];

    let last = segments[segments.len() - 1];
    let middle = &segments[1..segments.len() - 1];

    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }

    rest.ends_with(last) && rest.len() >= last.len()
}
