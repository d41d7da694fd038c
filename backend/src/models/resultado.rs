use super::{check_not_empty, check_range, Validate};
use crate::store::Document;
use serde::{Deserialize, Serialize};

/// Exam result of one participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resultado {
    /// Sequential number (natural key)
    pub nu_sequencial: String,
    /// Exam year
    pub nu_ano: i64,
    /// Enrollment number of the participant
    pub participante_inscricao: String,

    /// INEP school code
    pub escola_codigo: Option<i64>,
    /// School municipality code
    pub municipio_escola_codigo: Option<i64>,
    /// School municipality name
    pub municipio_escola_nome: Option<String>,
    /// School state code
    pub uf_escola_codigo: Option<i64>,
    /// School state abbreviation
    pub uf_escola_sigla: Option<String>,
    /// Administrative dependency code
    pub dependencia_administrativa: Option<i64>,
    /// School location type code
    pub localizacao_escola: Option<i64>,
    /// Operating status code
    pub situacao_funcionamento: Option<i64>,

    /// Exam municipality code
    pub municipio_prova_codigo: Option<i64>,
    /// Exam municipality name
    pub municipio_prova_nome: Option<String>,
    /// Exam state code
    pub uf_prova_codigo: Option<i64>,
    /// Exam state abbreviation
    pub uf_prova_sigla: Option<String>,

    /// Attendance codes (0 absent, 1 present, 2 eliminated)
    pub presenca_cn: Option<i64>,
    /// Attendance code, CH
    pub presenca_ch: Option<i64>,
    /// Attendance code, LC
    pub presenca_lc: Option<i64>,
    /// Attendance code, MT
    pub presenca_mt: Option<i64>,

    /// Exam version code, CN
    pub codigo_prova_cn: Option<String>,
    /// Exam version code, CH
    pub codigo_prova_ch: Option<String>,
    /// Exam version code, LC
    pub codigo_prova_lc: Option<String>,
    /// Exam version code, MT
    pub codigo_prova_mt: Option<String>,

    /// Score, CN
    pub nota_cn: Option<f64>,
    /// Score, CH
    pub nota_ch: Option<f64>,
    /// Score, LC
    pub nota_lc: Option<f64>,
    /// Score, MT
    pub nota_mt: Option<f64>,
    /// Essay score
    pub nota_redacao: Option<f64>,

    /// Answer string, CN
    pub respostas_cn: Option<String>,
    /// Answer string, CH
    pub respostas_ch: Option<String>,
    /// Answer string, LC
    pub respostas_lc: Option<String>,
    /// Answer string, MT
    pub respostas_mt: Option<String>,

    /// Answer key, CN
    pub gabarito_cn: Option<String>,
    /// Answer key, CH
    pub gabarito_ch: Option<String>,
    /// Answer key, LC
    pub gabarito_lc: Option<String>,
    /// Answer key, MT
    pub gabarito_mt: Option<String>,

    /// 0 English, 1 Spanish
    pub lingua_estrangeira: Option<i64>,
    /// Essay status code
    pub status_redacao: Option<i64>,
    /// Essay rubric component 1
    pub nota_comp1: Option<f64>,
    /// Essay rubric component 2
    pub nota_comp2: Option<f64>,
    /// Essay rubric component 3
    pub nota_comp3: Option<f64>,
    /// Essay rubric component 4
    pub nota_comp4: Option<f64>,
    /// Essay rubric component 5
    pub nota_comp5: Option<f64>,

    /// Mean of the objective scores present
    pub media_provas_objetivas: Option<f64>,
    /// Correct answers across the objective tests
    pub total_acertos: Option<i64>,
}

impl Document for Resultado {
    const COLLECTION: &'static str = "resultados";
}

/// Mean of the scores that are present, `None` when none is
pub fn objective_mean(scores: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = scores.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Positions where the answer matches the key
pub fn count_correct_answers(respostas: &str, gabarito: &str) -> i64 {
    respostas
        .chars()
        .zip(gabarito.chars())
        .filter(|(r, g)| r == g)
        .count() as i64
}

impl Resultado {
    /// Objective scores in CN, CH, LC, MT order
    pub fn objective_scores(&self) -> [Option<f64>; 4] {
        [self.nota_cn, self.nota_ch, self.nota_lc, self.nota_mt]
    }

    fn answer_pairs(&self) -> [(Option<&str>, Option<&str>); 4] {
        [
            (self.respostas_cn.as_deref(), self.gabarito_cn.as_deref()),
            (self.respostas_ch.as_deref(), self.gabarito_ch.as_deref()),
            (self.respostas_lc.as_deref(), self.gabarito_lc.as_deref()),
            (self.respostas_mt.as_deref(), self.gabarito_mt.as_deref()),
        ]
    }

    /// Correct answers for the objective area `codigo` (CN, CH, LC, MT)
    pub fn correct_answers_in(&self, codigo: &str) -> Option<i64> {
        let index = ["CN", "CH", "LC", "MT"].iter().position(|c| *c == codigo)?;
        match self.answer_pairs()[index] {
            (Some(respostas), Some(gabarito)) => Some(count_correct_answers(respostas, gabarito)),
            _ => None,
        }
    }

    /// Recompute `media_provas_objetivas` and `total_acertos`
    pub fn with_derived_fields(mut self) -> Self {
        self.media_provas_objetivas = objective_mean(&self.objective_scores());

        let counts: Vec<i64> = self
            .answer_pairs()
            .iter()
            .filter_map(|pair| match pair {
                (Some(respostas), Some(gabarito)) => Some(count_correct_answers(respostas, gabarito)),
                _ => None,
            })
            .collect();
        self.total_acertos = if counts.is_empty() {
            None
        } else {
            Some(counts.iter().sum())
        };
        self
    }
}

fn check_scores(notas: &[(&str, Option<f64>)], comps: &[(&str, Option<f64>)]) -> Result<(), String> {
    for (field, value) in notas {
        check_range(field, *value, 0.0, 1000.0)?;
    }
    for (field, value) in comps {
        check_range(field, *value, 0.0, 200.0)?;
    }
    Ok(())
}

impl Validate for Resultado {
    fn validate(&self) -> Result<(), String> {
        check_not_empty("nu_sequencial", Some(&self.nu_sequencial))?;
        check_not_empty("participante_inscricao", Some(&self.participante_inscricao))?;
        check_scores(
            &[
                ("nota_cn", self.nota_cn),
                ("nota_ch", self.nota_ch),
                ("nota_lc", self.nota_lc),
                ("nota_mt", self.nota_mt),
                ("nota_redacao", self.nota_redacao),
            ],
            &[
                ("nota_comp1", self.nota_comp1),
                ("nota_comp2", self.nota_comp2),
                ("nota_comp3", self.nota_comp3),
                ("nota_comp4", self.nota_comp4),
                ("nota_comp5", self.nota_comp5),
            ],
        )
    }
}

/// Partial update of a result; derived fields are left as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ResultadoUpdate {
    pub escola_codigo: Option<i64>,
    pub municipio_escola_codigo: Option<i64>,
    pub municipio_escola_nome: Option<String>,
    pub uf_escola_codigo: Option<i64>,
    pub uf_escola_sigla: Option<String>,
    pub municipio_prova_codigo: Option<i64>,
    pub municipio_prova_nome: Option<String>,
    pub uf_prova_codigo: Option<i64>,
    pub uf_prova_sigla: Option<String>,
    pub presenca_cn: Option<i64>,
    pub presenca_ch: Option<i64>,
    pub presenca_lc: Option<i64>,
    pub presenca_mt: Option<i64>,
    pub nota_cn: Option<f64>,
    pub nota_ch: Option<f64>,
    pub nota_lc: Option<f64>,
    pub nota_mt: Option<f64>,
    pub nota_redacao: Option<f64>,
    pub status_redacao: Option<i64>,
    pub nota_comp1: Option<f64>,
    pub nota_comp2: Option<f64>,
    pub nota_comp3: Option<f64>,
    pub nota_comp4: Option<f64>,
    pub nota_comp5: Option<f64>,
}

impl Validate for ResultadoUpdate {
    fn validate(&self) -> Result<(), String> {
        check_scores(
            &[
                ("nota_cn", self.nota_cn),
                ("nota_ch", self.nota_ch),
                ("nota_lc", self.nota_lc),
                ("nota_mt", self.nota_mt),
                ("nota_redacao", self.nota_redacao),
            ],
            &[
                ("nota_comp1", self.nota_comp1),
                ("nota_comp2", self.nota_comp2),
                ("nota_comp3", self.nota_comp3),
                ("nota_comp4", self.nota_comp4),
                ("nota_comp5", self.nota_comp5),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_mean_ignores_missing_scores() {
        assert_eq!(objective_mean(&[Some(500.0), None, Some(700.0), None]), Some(600.0));
        assert_eq!(objective_mean(&[None, None, None, None]), None);
    }

    #[test]
    fn test_count_correct_answers_is_positional() {
        assert_eq!(count_correct_answers("ABCDE", "ABDDA"), 3);
        assert_eq!(count_correct_answers("AB", "ABCD"), 2);
        assert_eq!(count_correct_answers("", "ABCD"), 0);
    }

    #[test]
    fn test_with_derived_fields() {
        let resultado = Resultado {
            nu_sequencial: "1".to_string(),
            participante_inscricao: "1".to_string(),
            nota_cn: Some(450.0),
            nota_mt: Some(650.0),
            respostas_cn: Some("ABCDE".to_string()),
            gabarito_cn: Some("ABCDD".to_string()),
            respostas_mt: Some("EEEEE".to_string()),
            gabarito_mt: Some("EAEAE".to_string()),
            respostas_ch: Some("AAAAA".to_string()),
            ..Default::default()
        }
        .with_derived_fields();

        assert_eq!(resultado.media_provas_objetivas, Some(550.0));
        assert_eq!(resultado.total_acertos, Some(7));
        assert_eq!(resultado.correct_answers_in("CN"), Some(4));
        assert_eq!(resultado.correct_answers_in("CH"), None);
        assert_eq!(resultado.correct_answers_in("RE"), None);
    }

    #[test]
    fn test_score_ranges() {
        let update = ResultadoUpdate {
            nota_comp3: Some(240.0),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().contains("nota_comp3"));

        let update = ResultadoUpdate {
            nota_redacao: Some(980.0),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }
}
