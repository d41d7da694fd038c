//! Shared helpers for statistics: rounding, percentages, score brackets
//! and code labels from the INEP data dictionary.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total` as a percentage rounded to two places (0 when total is 0)
pub fn percentual(part: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// A score bracket `[min, max)`, or `[min, max]` when `inclusive_max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Display name
    pub nome: &'static str,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Whether `max` itself belongs to the bracket
    pub inclusive_max: bool,
}

impl Bracket {
    const fn new(nome: &'static str, min: f64, max: f64) -> Self {
        Self {
            nome,
            min,
            max,
            inclusive_max: false,
        }
    }

    const fn closed(nome: &'static str, min: f64, max: f64) -> Self {
        Self {
            nome,
            min,
            max,
            inclusive_max: true,
        }
    }

    /// Whether `value` falls inside the bracket
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && (value < self.max || (self.inclusive_max && value == self.max))
    }
}

/// Essay score brackets
pub const REDACAO_BRACKETS: [Bracket; 5] = [
    Bracket::new("Muito Baixa", 0.0, 200.0),
    Bracket::new("Baixa", 200.0, 400.0),
    Bracket::new("Média", 400.0, 600.0),
    Bracket::new("Boa", 600.0, 800.0),
    Bracket::closed("Excelente", 800.0, 1000.0),
];

/// Per-area score brackets
pub const AREA_BRACKETS: [Bracket; 7] = [
    Bracket::new("0-200", 0.0, 200.0),
    Bracket::new("200-400", 200.0, 400.0),
    Bracket::new("400-600", 400.0, 600.0),
    Bracket::new("600-700", 600.0, 700.0),
    Bracket::new("700-800", 700.0, 800.0),
    Bracket::new("800-900", 800.0, 900.0),
    Bracket::closed("900-1000", 900.0, 1000.0),
];

/// SQL `CASE` mapping `expr` to the index of its bracket, `-1` when the
/// value is missing or outside every bracket
pub fn bracket_case_sql(expr: &str, brackets: &[Bracket]) -> String {
    let mut sql = format!("CASE WHEN {} IS NULL THEN -1", expr);
    for (i, bracket) in brackets.iter().enumerate() {
        let upper = if bracket.inclusive_max { "<=" } else { "<" };
        sql.push_str(&format!(
            " WHEN {e} >= {min} AND {e} {op} {max} THEN {i}",
            e = expr,
            min = bracket.min,
            op = upper,
            max = bracket.max,
            i = i
        ));
    }
    sql.push_str(" ELSE -1 END");
    sql
}

/// Administrative dependency of a school
pub fn dependencia_label(codigo: i64) -> &'static str {
    match codigo {
        1 => "Federal",
        2 => "Estadual",
        3 => "Municipal",
        4 => "Privada",
        _ => "Não informado",
    }
}

/// School location
pub fn localizacao_label(codigo: i64) -> &'static str {
    match codigo {
        1 => "Urbana",
        2 => "Rural",
        _ => "Não informado",
    }
}

/// School operating status
pub fn situacao_label(codigo: i64) -> &'static str {
    match codigo {
        1 => "Em atividade",
        2 => "Paralisada",
        3 => "Extinta",
        4 => "Extinta em anos anteriores",
        _ => "Não informado",
    }
}

/// Participant sex
pub fn sexo_label(sexo: &str) -> &'static str {
    match sexo {
        "M" => "Masculino",
        "F" => "Feminino",
        _ => "Não informado",
    }
}

/// Self-declared race/ethnicity
pub fn cor_raca_label(codigo: i64) -> &'static str {
    match codigo {
        0 => "Não declarado",
        1 => "Branca",
        2 => "Preta",
        3 => "Parda",
        4 => "Amarela",
        5 => "Indígena",
        6 => "Não dispõe da informação",
        _ => "Não informado",
    }
}

/// Age bracket code (TP_FAIXA_ETARIA)
pub fn faixa_etaria_label(codigo: i64) -> String {
    match codigo {
        1 => "Menor de 17 anos".to_string(),
        2..=10 => format!("{} anos", codigo + 15),
        11..=19 => {
            let inicio = 26 + (codigo - 11) * 5;
            format!("Entre {} e {} anos", inicio, inicio + 4)
        }
        20 => "Maior de 70 anos".to_string(),
        _ => "Não informado".to_string(),
    }
}

static UF_NOMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AC", "Acre"),
        ("AL", "Alagoas"),
        ("AP", "Amapá"),
        ("AM", "Amazonas"),
        ("BA", "Bahia"),
        ("CE", "Ceará"),
        ("DF", "Distrito Federal"),
        ("ES", "Espírito Santo"),
        ("GO", "Goiás"),
        ("MA", "Maranhão"),
        ("MT", "Mato Grosso"),
        ("MS", "Mato Grosso do Sul"),
        ("MG", "Minas Gerais"),
        ("PA", "Pará"),
        ("PB", "Paraíba"),
        ("PR", "Paraná"),
        ("PE", "Pernambuco"),
        ("PI", "Piauí"),
        ("RJ", "Rio de Janeiro"),
        ("RN", "Rio Grande do Norte"),
        ("RS", "Rio Grande do Sul"),
        ("RO", "Rondônia"),
        ("RR", "Roraima"),
        ("SC", "Santa Catarina"),
        ("SP", "São Paulo"),
        ("SE", "Sergipe"),
        ("TO", "Tocantins"),
    ])
});

/// Full state name, falling back to the abbreviation itself
pub fn uf_nome(sigla: &str) -> String {
    UF_NOMES
        .get(sigla)
        .map(|n| n.to_string())
        .unwrap_or_else(|| sigla.to_string())
}

/// Region of an IBGE state code (first digit of the code)
pub fn regiao_for_uf(uf_codigo: i64) -> Option<&'static str> {
    match uf_codigo / 10 {
        1 => Some("Norte"),
        2 => Some("Nordeste"),
        3 => Some("Sudeste"),
        4 => Some("Sul"),
        5 => Some("Centro-Oeste"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentual() {
        assert_eq!(percentual(1, 3), 33.33);
        assert_eq!(percentual(5, 0), 0.0);
        let parts = [percentual(1, 3), percentual(1, 3), percentual(1, 3)];
        assert!((parts.iter().sum::<f64>() - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_bracket_bounds() {
        assert!(REDACAO_BRACKETS[4].contains(1000.0));
        assert!(!REDACAO_BRACKETS[3].contains(800.0));
        assert!(REDACAO_BRACKETS[0].contains(0.0));
        assert!(!AREA_BRACKETS.iter().any(|b| b.contains(1000.5)));
    }

    #[test]
    fn test_bracket_case_sql() {
        let sql = bracket_case_sql("n", &REDACAO_BRACKETS[..2]);
        assert_eq!(
            sql,
            "CASE WHEN n IS NULL THEN -1 WHEN n >= 0 AND n < 200 THEN 0 WHEN n >= 200 AND n < 400 THEN 1 ELSE -1 END"
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(dependencia_label(4), "Privada");
        assert_eq!(localizacao_label(2), "Rural");
        assert_eq!(faixa_etaria_label(1), "Menor de 17 anos");
        assert_eq!(faixa_etaria_label(3), "18 anos");
        assert_eq!(faixa_etaria_label(11), "Entre 26 e 30 anos");
        assert_eq!(faixa_etaria_label(19), "Entre 66 e 70 anos");
        assert_eq!(faixa_etaria_label(20), "Maior de 70 anos");
        assert_eq!(uf_nome("PE"), "Pernambuco");
        assert_eq!(uf_nome("XX"), "XX");
    }

    #[test]
    fn test_regiao_for_uf() {
        assert_eq!(regiao_for_uf(35), Some("Sudeste"));
        assert_eq!(regiao_for_uf(53), Some("Centro-Oeste"));
        assert_eq!(regiao_for_uf(0), None);
    }
}
