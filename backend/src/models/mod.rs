//! ENEM document models
//!
//! One module per collection. Each document type has a companion `*Update`
//! struct whose present fields form a partial merge patch.

mod area;
mod escola;
mod municipio;
mod participante;
mod resultado;

pub use area::{area_info, AreaConhecimento, AreaConhecimentoUpdate, AreaInfo, ParticipanteArea, AREAS};
pub use escola::{Escola, EscolaUpdate};
pub use municipio::{Municipio, MunicipioUpdate};
pub use participante::{Participante, ParticipanteUpdate, Questionario};
pub use resultado::{count_correct_answers, objective_mean, Resultado, ResultadoUpdate};

use serde::Serialize;
use serde_json::{Map, Value};

/// Range and format checks that serde cannot express
pub trait Validate {
    /// Returns a human-readable message for the first violated rule
    fn validate(&self) -> Result<(), String>;
}

/// Present (non-null) fields of an update request as a merge patch
pub fn into_patch<U: Serialize>(update: &U) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(update)? {
        Value::Object(fields) => Ok(fields.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        _ => Ok(Map::new()),
    }
}

pub(crate) fn check_range<T>(field: &str, value: Option<T>, min: T, max: T) -> Result<(), String>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    match value {
        Some(v) if v < min || v > max => Err(format!(
            "{} must be between {} and {} (got {})",
            field, min, max, v
        )),
        _ => Ok(()),
    }
}

pub(crate) fn check_not_empty(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if v.trim().is_empty() => Err(format!("{} cannot be empty", field)),
        _ => Ok(()),
    }
}

pub(crate) fn check_uf(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if v.len() != 2 || !v.chars().all(|c| c.is_ascii_alphabetic()) => Err(format!(
            "{} must be a two-letter state abbreviation (got '{}')",
            field, v
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Partial {
        nome: Option<String>,
        idh: Option<f64>,
    }

    #[test]
    fn test_into_patch_drops_absent_fields() {
        let patch = into_patch(&Partial {
            nome: None,
            idh: Some(0.8),
        })
        .unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["idh"], Value::from(0.8));
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("idh", Some(0.5), 0.0, 1.0).is_ok());
        assert!(check_range::<f64>("idh", None, 0.0, 1.0).is_ok());
        let err = check_range("idh", Some(1.5), 0.0, 1.0).unwrap_err();
        assert!(err.contains("idh"));
    }

    #[test]
    fn test_check_uf() {
        assert!(check_uf("uf_sigla", Some("SP")).is_ok());
        assert!(check_uf("uf_sigla", Some("SPX")).is_err());
        assert!(check_uf("uf_sigla", Some("1A")).is_err());
    }
}
