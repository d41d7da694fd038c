//! Building collection documents from the CSV snapshot

use super::csv_source::{CsvRow, CsvTable};
use crate::models::{
    AreaConhecimento, Escola, Municipio, Participante, ParticipanteArea, Questionario, Resultado,
    Validate, AREAS,
};
use crate::stats::regiao_for_uf;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Documents of every collection, ready to be stored
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Municipalities seen in exam and school locations
    pub municipios: Vec<Municipio>,
    /// Schools referenced by results
    pub escolas: Vec<Escola>,
    /// Participants
    pub participantes: Vec<Participante>,
    /// Results with derived fields
    pub resultados: Vec<Resultado>,
    /// The fixed knowledge areas
    pub areas: Vec<AreaConhecimento>,
    /// One row per result and area
    pub participantes_areas: Vec<ParticipanteArea>,
    /// CSV rows dropped for missing or invalid fields
    pub linhas_ignoradas: usize,
}

fn required<T>(value: Option<T>, column: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("missing {}", column))
}

fn questionario(table: &CsvTable, row: &CsvRow<'_>) -> Result<Option<Questionario>, String> {
    let answers: Map<String, Value> = Questionario::columns()
        .filter(|c| table.has_column(c))
        .map(|c| {
            let value = row.text(&c).map_or(Value::Null, Value::from);
            (c, value)
        })
        .collect();
    if answers.is_empty() {
        return Ok(None);
    }
    serde_json::from_value(Value::Object(answers))
        .map(Some)
        .map_err(|e| format!("invalid questionnaire: {}", e))
}

fn participante(table: &CsvTable, row: &CsvRow<'_>) -> Result<Participante, String> {
    let participante = Participante {
        nu_inscricao: required(row.text("NU_INSCRICAO"), "NU_INSCRICAO")?,
        nu_ano: required(row.int("NU_ANO"), "NU_ANO")?,
        faixa_etaria: required(row.int("TP_FAIXA_ETARIA"), "TP_FAIXA_ETARIA")?,
        sexo: required(row.text("TP_SEXO"), "TP_SEXO")?,
        estado_civil: required(row.int("TP_ESTADO_CIVIL"), "TP_ESTADO_CIVIL")?,
        cor_raca: required(row.int("TP_COR_RACA"), "TP_COR_RACA")?,
        nacionalidade: required(row.int("TP_NACIONALIDADE"), "TP_NACIONALIDADE")?,
        st_conclusao: required(row.int("TP_ST_CONCLUSAO"), "TP_ST_CONCLUSAO")?,
        ano_concluiu: row.int("TP_ANO_CONCLUIU"),
        ensino: row.int("TP_ENSINO"),
        treineiro: row.flag("IN_TREINEIRO").unwrap_or(false),
        municipio_prova_codigo: row.int("CO_MUNICIPIO_PROVA"),
        uf_prova: row.text("SG_UF_PROVA"),
        questionario: questionario(table, row)?,
    };
    participante.validate()?;
    Ok(participante)
}

fn resultado(row: &CsvRow<'_>) -> Result<Resultado, String> {
    let nu_sequencial = required(row.text("NU_SEQUENCIAL"), "NU_SEQUENCIAL")?;
    let resultado = Resultado {
        nu_ano: required(row.int("NU_ANO"), "NU_ANO")?,
        // Sample exports without NU_INSCRICAO key results by their sequential number
        participante_inscricao: row
            .text("NU_INSCRICAO")
            .unwrap_or_else(|| nu_sequencial.clone()),
        nu_sequencial,
        escola_codigo: row.int("CO_ESCOLA"),
        municipio_escola_codigo: row.int("CO_MUNICIPIO_ESC"),
        municipio_escola_nome: row.text("NO_MUNICIPIO_ESC"),
        uf_escola_codigo: row.int("CO_UF_ESC"),
        uf_escola_sigla: row.text("SG_UF_ESC"),
        dependencia_administrativa: row.int("TP_DEPENDENCIA_ADM_ESC"),
        localizacao_escola: row.int("TP_LOCALIZACAO_ESC"),
        situacao_funcionamento: row.int("TP_SIT_FUNC_ESC"),
        municipio_prova_codigo: row.int("CO_MUNICIPIO_PROVA"),
        municipio_prova_nome: row.text("NO_MUNICIPIO_PROVA"),
        uf_prova_codigo: row.int("CO_UF_PROVA"),
        uf_prova_sigla: row.text("SG_UF_PROVA"),
        presenca_cn: row.int("TP_PRESENCA_CN"),
        presenca_ch: row.int("TP_PRESENCA_CH"),
        presenca_lc: row.int("TP_PRESENCA_LC"),
        presenca_mt: row.int("TP_PRESENCA_MT"),
        codigo_prova_cn: row.text("CO_PROVA_CN"),
        codigo_prova_ch: row.text("CO_PROVA_CH"),
        codigo_prova_lc: row.text("CO_PROVA_LC"),
        codigo_prova_mt: row.text("CO_PROVA_MT"),
        nota_cn: row.float("NU_NOTA_CN"),
        nota_ch: row.float("NU_NOTA_CH"),
        nota_lc: row.float("NU_NOTA_LC"),
        nota_mt: row.float("NU_NOTA_MT"),
        nota_redacao: row.float("NU_NOTA_REDACAO"),
        respostas_cn: row.text("TX_RESPOSTAS_CN"),
        respostas_ch: row.text("TX_RESPOSTAS_CH"),
        respostas_lc: row.text("TX_RESPOSTAS_LC"),
        respostas_mt: row.text("TX_RESPOSTAS_MT"),
        gabarito_cn: row.text("TX_GABARITO_CN"),
        gabarito_ch: row.text("TX_GABARITO_CH"),
        gabarito_lc: row.text("TX_GABARITO_LC"),
        gabarito_mt: row.text("TX_GABARITO_MT"),
        lingua_estrangeira: row.int("TP_LINGUA"),
        status_redacao: row.int("TP_STATUS_REDACAO"),
        nota_comp1: row.float("NU_NOTA_COMP1"),
        nota_comp2: row.float("NU_NOTA_COMP2"),
        nota_comp3: row.float("NU_NOTA_COMP3"),
        nota_comp4: row.float("NU_NOTA_COMP4"),
        nota_comp5: row.float("NU_NOTA_COMP5"),
        media_provas_objetivas: None,
        total_acertos: None,
    }
    .with_derived_fields();
    resultado.validate()?;
    Ok(resultado)
}

/// Municipality seen at a location; the first sighting of a code wins
fn municipio(codigo: i64, nome: Option<String>, uf_codigo: Option<i64>, uf_sigla: Option<String>) -> Municipio {
    let uf_codigo = uf_codigo.unwrap_or(0);
    Municipio {
        codigo,
        nome: nome.unwrap_or_else(|| format!("Município {}", codigo)),
        uf_codigo,
        uf_sigla: uf_sigla.unwrap_or_else(|| "BR".to_string()),
        regiao: regiao_for_uf(uf_codigo).map(str::to_string),
        populacao: None,
        pib_per_capita: None,
        idh: None,
    }
}

fn escola(resultado: &Resultado, codigo: i64) -> Escola {
    Escola {
        codigo,
        nome: Some(format!("Escola {}", codigo)),
        municipio_codigo: resultado.municipio_escola_codigo.unwrap_or(0),
        uf_codigo: resultado.uf_escola_codigo.unwrap_or(0),
        uf_sigla: resultado
            .uf_escola_sigla
            .clone()
            .unwrap_or_else(|| "BR".to_string()),
        dependencia_administrativa: resultado.dependencia_administrativa.unwrap_or(0),
        localizacao: resultado.localizacao_escola.unwrap_or(0),
        situacao_funcionamento: resultado.situacao_funcionamento.unwrap_or(0),
        total_participantes: 0,
    }
}

/// Per area rows of one result, in catalog order
pub fn areas_do_resultado(resultado: &Resultado) -> Vec<ParticipanteArea> {
    AREAS
        .iter()
        .map(|area| {
            let (nota, presenca, codigo_prova) = match area.codigo {
                "CN" => (resultado.nota_cn, resultado.presenca_cn == Some(1), resultado.codigo_prova_cn.clone()),
                "CH" => (resultado.nota_ch, resultado.presenca_ch == Some(1), resultado.codigo_prova_ch.clone()),
                "LC" => (resultado.nota_lc, resultado.presenca_lc == Some(1), resultado.codigo_prova_lc.clone()),
                "MT" => (resultado.nota_mt, resultado.presenca_mt == Some(1), resultado.codigo_prova_mt.clone()),
                _ => (resultado.nota_redacao, resultado.nota_redacao.is_some(), None),
            };
            ParticipanteArea {
                participante_inscricao: resultado.participante_inscricao.clone(),
                area_codigo: area.codigo.to_string(),
                ano_prova: resultado.nu_ano,
                nota,
                presenca,
                numero_acertos: resultado.correct_answers_in(area.codigo),
                codigo_prova,
            }
        })
        .collect()
}

/// Turn the two CSV files into the documents of every collection
pub fn build_snapshot(participantes_csv: &CsvTable, resultados_csv: &CsvTable) -> Snapshot {
    let mut snapshot = Snapshot {
        areas: AREAS.iter().map(AreaConhecimento::from).collect(),
        ..Default::default()
    };
    let mut municipios: BTreeMap<i64, Municipio> = BTreeMap::new();
    let mut escolas: BTreeMap<i64, Escola> = BTreeMap::new();
    let mut inscricoes: HashSet<String> = HashSet::new();
    let mut sequenciais: HashSet<String> = HashSet::new();
    let mut pares: HashSet<(String, String)> = HashSet::new();

    for (line, row) in participantes_csv.rows().enumerate() {
        let p = match participante(participantes_csv, &row) {
            Ok(p) => p,
            Err(reason) => {
                warn!("Skipping participant row {}: {}", line + 2, reason);
                snapshot.linhas_ignoradas += 1;
                continue;
            }
        };
        if !inscricoes.insert(p.nu_inscricao.clone()) {
            warn!("Skipping duplicate participant {}", p.nu_inscricao);
            snapshot.linhas_ignoradas += 1;
            continue;
        }
        if let Some(codigo) = p.municipio_prova_codigo {
            municipios.entry(codigo).or_insert_with(|| {
                municipio(
                    codigo,
                    row.text("NO_MUNICIPIO_PROVA"),
                    row.int("CO_UF_PROVA"),
                    p.uf_prova.clone(),
                )
            });
        }
        snapshot.participantes.push(p);
    }

    for (line, row) in resultados_csv.rows().enumerate() {
        let r = match resultado(&row) {
            Ok(r) => r,
            Err(reason) => {
                warn!("Skipping result row {}: {}", line + 2, reason);
                snapshot.linhas_ignoradas += 1;
                continue;
            }
        };
        if !sequenciais.insert(r.nu_sequencial.clone()) {
            warn!("Skipping duplicate result {}", r.nu_sequencial);
            snapshot.linhas_ignoradas += 1;
            continue;
        }

        if let Some(codigo) = r.municipio_prova_codigo {
            municipios.entry(codigo).or_insert_with(|| {
                municipio(
                    codigo,
                    r.municipio_prova_nome.clone(),
                    r.uf_prova_codigo,
                    r.uf_prova_sigla.clone(),
                )
            });
        }
        if let Some(codigo) = r.municipio_escola_codigo {
            municipios.entry(codigo).or_insert_with(|| {
                municipio(
                    codigo,
                    r.municipio_escola_nome.clone(),
                    r.uf_escola_codigo,
                    r.uf_escola_sigla.clone(),
                )
            });
        }
        if let Some(codigo) = r.escola_codigo.filter(|c| *c > 0) {
            escolas
                .entry(codigo)
                .or_insert_with(|| escola(&r, codigo))
                .total_participantes += 1;
        }

        for area in areas_do_resultado(&r) {
            if pares.insert((area.participante_inscricao.clone(), area.area_codigo.clone())) {
                snapshot.participantes_areas.push(area);
            } else {
                debug!(
                    "Area {} of participant {} already loaded",
                    area.area_codigo, area.participante_inscricao
                );
            }
        }
        snapshot.resultados.push(r);
    }

    snapshot.municipios = validos("municipality", municipios, &mut snapshot.linhas_ignoradas);
    snapshot.escolas = validos("school", escolas, &mut snapshot.linhas_ignoradas);
    snapshot
}

/// Documents passing validation, in key order; the rest are logged and counted as ignored
fn validos<T: Validate>(kind: &str, docs: BTreeMap<i64, T>, ignoradas: &mut usize) -> Vec<T> {
    docs.into_iter()
        .filter_map(|(codigo, doc)| match doc.validate() {
            Ok(()) => Some(doc),
            Err(reason) => {
                warn!("Skipping {} {}: {}", kind, codigo, reason);
                *ignoradas += 1;
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTICIPANTES: &str = "\
NU_INSCRICAO,NU_ANO,TP_FAIXA_ETARIA,TP_SEXO,TP_ESTADO_CIVIL,TP_COR_RACA,TP_NACIONALIDADE,TP_ST_CONCLUSAO,TP_ANO_CONCLUIU,TP_ENSINO,IN_TREINEIRO,CO_MUNICIPIO_PROVA,NO_MUNICIPIO_PROVA,CO_UF_PROVA,SG_UF_PROVA,Q001,Q002
210001,2023,3,F,1,3,1,2,0,1,0,2611606,Recife,26,PE,B,C
210002,2023.0,2,M,1,1,1,3,,,1,3550308,São Paulo,35,SP,,
210001,2023,3,F,1,3,1,2,0,1,0,2611606,Recife,26,PE,B,C
210003,2023,,F,1,1,1,1,,,0,,,,,,
";

    const RESULTADOS: &str = "\
NU_SEQUENCIAL,NU_ANO,CO_ESCOLA,CO_MUNICIPIO_ESC,NO_MUNICIPIO_ESC,CO_UF_ESC,SG_UF_ESC,TP_DEPENDENCIA_ADM_ESC,TP_LOCALIZACAO_ESC,TP_SIT_FUNC_ESC,CO_MUNICIPIO_PROVA,NO_MUNICIPIO_PROVA,CO_UF_PROVA,SG_UF_PROVA,TP_PRESENCA_CN,TP_PRESENCA_CH,TP_PRESENCA_LC,TP_PRESENCA_MT,NU_NOTA_CN,NU_NOTA_CH,NU_NOTA_LC,NU_NOTA_MT,NU_NOTA_REDACAO,TX_RESPOSTAS_MT,TX_GABARITO_MT
1,2023,35000001,3509502,Campinas,35,SP,2,1,1,3550308,São Paulo,35,SP,1,1,1,1,500,600,550,650,800,ABCDE,ABCCE
2,2023,35000001,3509502,Campinas,35,SP,2,1,1,3550308,São Paulo,35,SP,1,1,1,0,480,520,,,nan,,
3,2023,,,,,,,,,,,,,0,0,0,0,,,,,,,
,2023,,,,,,,,,,,,,,,,,,,,,,,
";

    fn snapshot() -> Snapshot {
        let participantes = CsvTable::parse(PARTICIPANTES, b',').unwrap();
        let resultados = CsvTable::parse(RESULTADOS, b',').unwrap();
        build_snapshot(&participantes, &resultados)
    }

    #[test]
    fn test_participants_are_cleaned_and_deduplicated() {
        let s = snapshot();
        assert_eq!(s.participantes.len(), 2);
        let first = &s.participantes[0];
        assert!(!first.treineiro);
        assert_eq!(first.questionario.as_ref().and_then(|q| q.q001.clone()).as_deref(), Some("B"));
        let second = &s.participantes[1];
        assert_eq!(second.nu_ano, 2023);
        assert!(second.treineiro);
        assert_eq!(second.ano_concluiu, None);
        // duplicate, missing age bracket, missing sequential number
        assert_eq!(s.linhas_ignoradas, 3);
    }

    #[test]
    fn test_results_carry_derived_fields() {
        let s = snapshot();
        assert_eq!(s.resultados.len(), 3);
        let r = &s.resultados[0];
        assert_eq!(r.participante_inscricao, "1");
        assert_eq!(r.media_provas_objetivas, Some(575.0));
        assert_eq!(r.total_acertos, Some(4));
        assert_eq!(s.resultados[1].nota_redacao, None);
    }

    #[test]
    fn test_schools_and_municipalities() {
        let s = snapshot();
        assert_eq!(s.escolas.len(), 1);
        assert_eq!(s.escolas[0].total_participantes, 2);
        assert_eq!(s.escolas[0].nome.as_deref(), Some("Escola 35000001"));

        let codigos: Vec<i64> = s.municipios.iter().map(|m| m.codigo).collect();
        assert_eq!(codigos, vec![2611606, 3509502, 3550308]);
        let recife = &s.municipios[0];
        assert_eq!(recife.nome, "Recife");
        assert_eq!(recife.regiao.as_deref(), Some("Nordeste"));
        assert_eq!(s.municipios[1].regiao.as_deref(), Some("Sudeste"));
    }

    #[test]
    fn test_invalid_municipality_is_skipped_and_counted() {
        let participantes = CsvTable::parse(
            "NU_INSCRICAO,NU_ANO,TP_FAIXA_ETARIA,TP_SEXO,TP_ESTADO_CIVIL,TP_COR_RACA,TP_NACIONALIDADE,TP_ST_CONCLUSAO,CO_MUNICIPIO_PROVA,NO_MUNICIPIO_PROVA,CO_UF_PROVA,SG_UF_PROVA\n\
             310001,2023,3,F,1,3,1,2,-7,Nenhures,26,PE\n\
             310002,2023,3,M,1,1,1,2,2611606,Recife,26,PE\n",
            b',',
        )
        .unwrap();
        let resultados = CsvTable::parse("NU_SEQUENCIAL,NU_ANO\n", b',').unwrap();
        let s = build_snapshot(&participantes, &resultados);

        assert_eq!(s.participantes.len(), 2);
        let codigos: Vec<i64> = s.municipios.iter().map(|m| m.codigo).collect();
        assert_eq!(codigos, vec![2611606]);
        assert_eq!(s.linhas_ignoradas, 1);
    }

    #[test]
    fn test_area_rows_per_result() {
        let s = snapshot();
        assert_eq!(s.areas.len(), 5);
        assert_eq!(s.participantes_areas.len(), 15);

        let mt = s
            .participantes_areas
            .iter()
            .find(|a| a.participante_inscricao == "1" && a.area_codigo == "MT")
            .unwrap();
        assert_eq!(mt.nota, Some(650.0));
        assert!(mt.presenca);
        assert_eq!(mt.numero_acertos, Some(4));

        let re_ausente = s
            .participantes_areas
            .iter()
            .find(|a| a.participante_inscricao == "2" && a.area_codigo == "RE")
            .unwrap();
        assert!(!re_ausente.presenca);
    }
}
