use super::{check_not_empty, check_range, Validate};
use crate::store::Document;
use serde::{Deserialize, Serialize};

/// Static description of one of the five ENEM knowledge areas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaInfo {
    /// Area code (CN, CH, LC, MT, RE)
    pub codigo: &'static str,
    /// Official name
    pub nome: &'static str,
    /// Short name used in statistics
    pub nome_curto: &'static str,
    /// snake_case key used in per-area breakdowns
    pub chave: &'static str,
    /// Description stored with the seeded area document
    pub descricao: &'static str,
}

/// The five fixed knowledge areas
pub const AREAS: [AreaInfo; 5] = [
    AreaInfo {
        codigo: "CN",
        nome: "Ciências da Natureza e suas Tecnologias",
        nome_curto: "Ciências da Natureza",
        chave: "ciencias_natureza",
        descricao: "Física, Química e Biologia",
    },
    AreaInfo {
        codigo: "CH",
        nome: "Ciências Humanas e suas Tecnologias",
        nome_curto: "Ciências Humanas",
        chave: "ciencias_humanas",
        descricao: "História, Geografia, Filosofia e Sociologia",
    },
    AreaInfo {
        codigo: "LC",
        nome: "Linguagens, Códigos e suas Tecnologias",
        nome_curto: "Linguagens e Códigos",
        chave: "linguagens_codigos",
        descricao: "Língua Portuguesa, Literatura, Língua Estrangeira, Artes, Educação Física e Tecnologias da Informação",
    },
    AreaInfo {
        codigo: "MT",
        nome: "Matemática e suas Tecnologias",
        nome_curto: "Matemática",
        chave: "matematica",
        descricao: "Matemática",
    },
    AreaInfo {
        codigo: "RE",
        nome: "Redação",
        nome_curto: "Redação",
        chave: "redacao",
        descricao: "Produção de texto dissertativo-argumentativo",
    },
];

/// Catalog entry for `codigo`
pub fn area_info(codigo: &str) -> Option<&'static AreaInfo> {
    AREAS.iter().find(|a| a.codigo == codigo)
}

fn default_peso() -> f64 {
    1.0
}

fn default_ativa() -> bool {
    true
}

/// A knowledge area document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConhecimento {
    /// Area code (natural key)
    pub codigo: String,
    /// Full name
    pub nome: String,
    /// Free-text description
    pub descricao: Option<String>,
    /// Abbreviation
    pub sigla: String,
    /// Default weight (0.1..=10)
    #[serde(default = "default_peso")]
    pub peso_default: f64,
    /// Whether the area is listed by default
    #[serde(default = "default_ativa")]
    pub ativa: bool,
}

impl Document for AreaConhecimento {
    const COLLECTION: &'static str = "areas_conhecimento";
}

impl From<&AreaInfo> for AreaConhecimento {
    fn from(info: &AreaInfo) -> Self {
        Self {
            codigo: info.codigo.to_string(),
            nome: info.nome.to_string(),
            descricao: Some(info.descricao.to_string()),
            sigla: info.codigo.to_string(),
            peso_default: default_peso(),
            ativa: true,
        }
    }
}

impl Validate for AreaConhecimento {
    fn validate(&self) -> Result<(), String> {
        check_not_empty("codigo", Some(&self.codigo))?;
        check_not_empty("nome", Some(&self.nome))?;
        check_not_empty("sigla", Some(&self.sigla))?;
        check_range("peso_default", Some(self.peso_default), 0.1, 10.0)
    }
}

/// Partial update of a knowledge area
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaConhecimentoUpdate {
    /// New name
    pub nome: Option<String>,
    /// New description
    pub descricao: Option<String>,
    /// New abbreviation
    pub sigla: Option<String>,
    /// New default weight
    pub peso_default: Option<f64>,
    /// New active flag
    pub ativa: Option<bool>,
}

impl Validate for AreaConhecimentoUpdate {
    fn validate(&self) -> Result<(), String> {
        check_not_empty("nome", self.nome.as_deref())?;
        check_not_empty("sigla", self.sigla.as_deref())?;
        check_range("peso_default", self.peso_default, 0.1, 10.0)
    }
}

/// Score and attendance of a participant in one area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipanteArea {
    /// Enrollment number of the participant
    pub participante_inscricao: String,
    /// Area code
    pub area_codigo: String,
    /// Exam year
    pub ano_prova: i64,
    /// Score in the area
    pub nota: Option<f64>,
    /// Attended the test
    pub presenca: bool,
    /// Correct answers (objective areas only)
    pub numero_acertos: Option<i64>,
    /// Exam version code
    pub codigo_prova: Option<String>,
}

impl Document for ParticipanteArea {
    const COLLECTION: &'static str = "participantes_areas";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(area_info("MT").map(|a| a.chave), Some("matematica"));
        assert!(area_info("XX").is_none());
    }

    #[test]
    fn test_defaults_applied_on_create() {
        let area: AreaConhecimento =
            serde_json::from_str(r#"{"codigo": "ES", "nome": "Espanhol", "sigla": "ES"}"#).unwrap();
        assert_eq!(area.peso_default, 1.0);
        assert!(area.ativa);
        assert!(area.validate().is_ok());
    }

    #[test]
    fn test_weight_out_of_range() {
        let update = AreaConhecimentoUpdate {
            peso_default: Some(0.05),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
