use super::{check_not_empty, check_range, check_uf, Validate};
use crate::store::Document;
use serde::{Deserialize, Serialize};

/// A Brazilian municipality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipio {
    /// IBGE municipality code (natural key)
    pub codigo: i64,
    /// Municipality name
    pub nome: String,
    /// IBGE state code
    pub uf_codigo: i64,
    /// State abbreviation
    pub uf_sigla: String,
    /// Geographic region (Norte, Nordeste, ...)
    pub regiao: Option<String>,
    /// Estimated population
    pub populacao: Option<i64>,
    /// GDP per capita
    pub pib_per_capita: Option<f64>,
    /// Human Development Index
    pub idh: Option<f64>,
}

impl Document for Municipio {
    const COLLECTION: &'static str = "municipios";
}

impl Validate for Municipio {
    fn validate(&self) -> Result<(), String> {
        if self.codigo <= 0 {
            return Err("codigo must be positive".to_string());
        }
        check_not_empty("nome", Some(&self.nome))?;
        check_uf("uf_sigla", Some(&self.uf_sigla))?;
        check_range("populacao", self.populacao, 0, i64::MAX)?;
        check_range("pib_per_capita", self.pib_per_capita, 0.0, f64::MAX)?;
        check_range("idh", self.idh, 0.0, 1.0)
    }
}

/// Partial update of a municipality
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MunicipioUpdate {
    /// New name
    pub nome: Option<String>,
    /// New region
    pub regiao: Option<String>,
    /// New population
    pub populacao: Option<i64>,
    /// New GDP per capita
    pub pib_per_capita: Option<f64>,
    /// New HDI
    pub idh: Option<f64>,
}

impl Validate for MunicipioUpdate {
    fn validate(&self) -> Result<(), String> {
        check_not_empty("nome", self.nome.as_deref())?;
        check_range("populacao", self.populacao, 0, i64::MAX)?;
        check_range("pib_per_capita", self.pib_per_capita, 0.0, f64::MAX)?;
        check_range("idh", self.idh, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campinas() -> Municipio {
        Municipio {
            codigo: 3509502,
            nome: "Campinas".to_string(),
            uf_codigo: 35,
            uf_sigla: "SP".to_string(),
            regiao: Some("Sudeste".to_string()),
            populacao: Some(1_223_237),
            pib_per_capita: Some(54_000.0),
            idh: Some(0.805),
        }
    }

    #[test]
    fn test_valid_municipio() {
        assert!(campinas().validate().is_ok());
    }

    #[test]
    fn test_invalid_idh_is_rejected() {
        let mut municipio = campinas();
        municipio.idh = Some(1.2);
        assert!(municipio.validate().unwrap_err().contains("idh"));
    }

    #[test]
    fn test_optional_fields_may_be_omitted() {
        let municipio: Municipio = serde_json::from_str(
            r#"{"codigo": 1, "nome": "X", "uf_codigo": 11, "uf_sigla": "RO"}"#,
        )
        .unwrap();
        assert_eq!(municipio.regiao, None);
        assert_eq!(municipio.populacao, None);
    }
}
