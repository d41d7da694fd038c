use super::{check_not_empty, check_range, check_uf, Validate};
use crate::store::Document;
use serde::{Deserialize, Serialize};

/// Socioeconomic questionnaire (answers Q001..Q023)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub struct Questionario {
    pub q001: Option<String>,
    pub q002: Option<String>,
    pub q003: Option<String>,
    pub q004: Option<String>,
    pub q005: Option<String>,
    pub q006: Option<String>,
    pub q007: Option<String>,
    pub q008: Option<String>,
    pub q009: Option<String>,
    pub q010: Option<String>,
    pub q011: Option<String>,
    pub q012: Option<String>,
    pub q013: Option<String>,
    pub q014: Option<String>,
    pub q015: Option<String>,
    pub q016: Option<String>,
    pub q017: Option<String>,
    pub q018: Option<String>,
    pub q019: Option<String>,
    pub q020: Option<String>,
    pub q021: Option<String>,
    pub q022: Option<String>,
    pub q023: Option<String>,
}

impl Questionario {
    /// Column names of the questionnaire in the microdata
    pub fn columns() -> impl Iterator<Item = String> {
        (1..=23).map(|i| format!("Q{:03}", i))
    }
}

/// An exam participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participante {
    /// Enrollment number (natural key)
    pub nu_inscricao: String,
    /// Exam year
    pub nu_ano: i64,
    /// Age bracket code (1..=20)
    pub faixa_etaria: i64,
    /// "M" or "F"
    pub sexo: String,
    /// Marital status code
    pub estado_civil: i64,
    /// Race/ethnicity code
    pub cor_raca: i64,
    /// Nationality code
    pub nacionalidade: i64,
    /// High-school completion status
    pub st_conclusao: i64,
    /// Year high school was completed
    pub ano_concluiu: Option<i64>,
    /// High-school type
    pub ensino: Option<i64>,
    /// Taking the exam as practice only
    #[serde(default)]
    pub treineiro: bool,
    /// Exam municipality code
    pub municipio_prova_codigo: Option<i64>,
    /// Exam state abbreviation
    pub uf_prova: Option<String>,
    /// Socioeconomic questionnaire
    pub questionario: Option<Questionario>,
}

impl Document for Participante {
    const COLLECTION: &'static str = "participantes";
}

fn check_sexo(value: Option<&str>) -> Result<(), String> {
    match value {
        Some(s) if s != "M" && s != "F" => Err(format!("sexo must be 'M' or 'F' (got '{}')", s)),
        _ => Ok(()),
    }
}

impl Validate for Participante {
    fn validate(&self) -> Result<(), String> {
        check_not_empty("nu_inscricao", Some(&self.nu_inscricao))?;
        check_sexo(Some(&self.sexo))?;
        check_range("faixa_etaria", Some(self.faixa_etaria), 1, 20)?;
        check_uf("uf_prova", self.uf_prova.as_deref())
    }
}

/// Partial update of a participant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipanteUpdate {
    /// New exam year
    pub nu_ano: Option<i64>,
    /// New age bracket code
    pub faixa_etaria: Option<i64>,
    /// New sex (M or F)
    pub sexo: Option<String>,
    /// New marital status code
    pub estado_civil: Option<i64>,
    /// New race/ethnicity code
    pub cor_raca: Option<i64>,
    /// New nationality code
    pub nacionalidade: Option<i64>,
    /// New completion status code
    pub st_conclusao: Option<i64>,
    /// New completion year code
    pub ano_concluiu: Option<i64>,
    /// New schooling type code
    pub ensino: Option<i64>,
    /// New trainee flag
    pub treineiro: Option<bool>,
    /// New exam municipality code
    pub municipio_prova_codigo: Option<i64>,
    /// New exam state abbreviation
    pub uf_prova: Option<String>,
    /// New questionnaire answers
    pub questionario: Option<Questionario>,
}

impl Validate for ParticipanteUpdate {
    fn validate(&self) -> Result<(), String> {
        check_sexo(self.sexo.as_deref())?;
        check_range("faixa_etaria", self.faixa_etaria, 1, 20)?;
        check_uf("uf_prova", self.uf_prova.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questionario_uses_uppercase_keys() {
        let questionario = Questionario {
            q001: Some("B".to_string()),
            q023: Some("A".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&questionario).unwrap();
        assert_eq!(json["Q001"], "B");
        assert_eq!(json["Q023"], "A");
        assert_eq!(Questionario::columns().last().as_deref(), Some("Q023"));
    }

    #[test]
    fn test_invalid_sexo_rejected() {
        let update = ParticipanteUpdate {
            sexo: Some("X".to_string()),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().contains("sexo"));
    }

    #[test]
    fn test_treineiro_defaults_to_false() {
        let participante: Participante = serde_json::from_str(
            r#"{"nu_inscricao": "210051", "nu_ano": 2023, "faixa_etaria": 3,
                "sexo": "F", "estado_civil": 1, "cor_raca": 3,
                "nacionalidade": 1, "st_conclusao": 2}"#,
        )
        .unwrap();
        assert!(!participante.treineiro);
        assert!(participante.validate().is_ok());
    }
}
