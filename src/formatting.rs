use crate::models::Person;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Mayuscula,
    Minuscula,
}

impl CaseMode {
    /// Unrecognized modes yield `None`, which leaves the name as is.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "mayuscula" => Some(CaseMode::Mayuscula),
            "minuscula" => Some(CaseMode::Minuscula),
            _ => None,
        }
    }
}

/// `"{nombre} {apellido}"`, optionally upper- or lower-cased.
pub fn full_name(person: &Person, mode: Option<CaseMode>) -> String {
    let base = format!("{} {}", person.nombre, person.apellido);
    match mode {
        Some(CaseMode::Mayuscula) => base.to_uppercase(),
        Some(CaseMode::Minuscula) => base.to_lowercase(),
        None => base,
    }
}

pub fn format_full_name(person: &Person, mode: Option<&str>) -> String {
    full_name(person, mode.and_then(CaseMode::parse))
}
