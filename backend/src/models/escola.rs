use super::{check_range, check_uf, Validate};
use crate::store::Document;
use serde::{Deserialize, Serialize};

/// A school referenced by exam results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escola {
    /// INEP school code (natural key)
    pub codigo: i64,
    /// School name
    pub nome: Option<String>,
    /// Municipality code
    pub municipio_codigo: i64,
    /// State code
    pub uf_codigo: i64,
    /// State abbreviation
    pub uf_sigla: String,
    /// 1 Federal, 2 Estadual, 3 Municipal, 4 Privada
    pub dependencia_administrativa: i64,
    /// 1 Urbana, 2 Rural
    pub localizacao: i64,
    /// Operating status code
    pub situacao_funcionamento: i64,
    /// Number of results linked to the school
    #[serde(default)]
    pub total_participantes: i64,
}

impl Document for Escola {
    const COLLECTION: &'static str = "escolas";
}

impl Validate for Escola {
    fn validate(&self) -> Result<(), String> {
        if self.codigo <= 0 {
            return Err("codigo must be positive".to_string());
        }
        check_uf("uf_sigla", Some(&self.uf_sigla))?;
        check_range("total_participantes", Some(self.total_participantes), 0, i64::MAX)
    }
}

/// Partial update of a school
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscolaUpdate {
    /// New name
    pub nome: Option<String>,
    /// New municipality code
    pub municipio_codigo: Option<i64>,
    /// New state code
    pub uf_codigo: Option<i64>,
    /// New state abbreviation
    pub uf_sigla: Option<String>,
    /// New administrative dependency
    pub dependencia_administrativa: Option<i64>,
    /// New location type
    pub localizacao: Option<i64>,
    /// New operating status
    pub situacao_funcionamento: Option<i64>,
    /// New participant count
    pub total_participantes: Option<i64>,
}

impl Validate for EscolaUpdate {
    fn validate(&self) -> Result<(), String> {
        check_uf("uf_sigla", self.uf_sigla.as_deref())?;
        check_range("total_participantes", self.total_participantes, 0, i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_participantes_defaults_to_zero() {
        let escola: Escola = serde_json::from_str(
            r#"{"codigo": 35000001, "municipio_codigo": 3550308, "uf_codigo": 35,
                "uf_sigla": "SP", "dependencia_administrativa": 2,
                "localizacao": 1, "situacao_funcionamento": 1}"#,
        )
        .unwrap();
        assert_eq!(escola.total_participantes, 0);
        assert_eq!(escola.nome, None);
        assert!(escola.validate().is_ok());
    }

    #[test]
    fn test_negative_participants_rejected() {
        let update = EscolaUpdate {
            total_participantes: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
