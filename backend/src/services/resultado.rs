//! Result operations, score means, state ranking and essay distribution

use super::{medias_por_area, or_default, Crud, EntityMessages, Paginated};
use crate::error::AppError;
use crate::models::{objective_mean, Resultado, AREAS};
use crate::repositories::{RedacaoBracketRow, ResultadoRepository};
use crate::stats::{percentual, round2, uf_nome, REDACAO_BRACKETS};
use crate::store::{Database, Filter, Page, Record, Sort, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

const MESSAGES: EntityMessages = EntityMessages {
    name: "resultado",
    not_found: "Resultado não encontrado",
    updated: "Resultado atualizado com sucesso",
    deleted: "Resultado deletado com sucesso",
};

/// Default cutoff of the highlight listing
pub const NOTA_CORTE_DEFAULT: f64 = 700.0;

/// Label of essay scores that are missing or outside 0..=1000
pub const FAIXA_INVALIDAS: &str = "Inválidas";

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ResultadoFiltros {
    /// Exam year
    pub ano: Option<i64>,
    /// School code
    pub escola_codigo: Option<i64>,
    /// Exam state abbreviation
    pub uf_prova_sigla: Option<String>,
}

impl ResultadoFiltros {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("nu_ano", self.ano)
            .eq_opt("escola_codigo", self.escola_codigo)
            .eq_opt("uf_prova_sigla", self.uf_prova_sigla.clone())
    }
}

/// Mean and participation of one area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaArea {
    /// Area code
    pub codigo: &'static str,
    /// Area name
    pub area: &'static str,
    /// Area key
    pub chave: &'static str,
    /// Mean score
    pub media: Option<f64>,
    /// Participants counted
    pub total_participantes: i64,
    /// Share of results with a score, in percent
    pub percentual_participacao: f64,
}

/// Per-area means over every result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediasGeraisResponse {
    /// Results counted
    pub total_resultados: i64,
    /// Per-area entries
    pub areas: Vec<MediaArea>,
    /// Mean of the area means
    pub media_geral_enem: Option<f64>,
}

/// State abbreviation and name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UfInfo {
    /// State abbreviation
    pub sigla: String,
    /// State name
    pub nome: String,
}

/// One state of the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingUf {
    /// 1-based rank
    pub posicao: usize,
    /// The state
    pub uf: UfInfo,
    /// Results in the state
    pub total_participantes: i64,
    /// Mean score per area key
    pub medias: BTreeMap<&'static str, Option<f64>>,
    /// Mean of the objective area means
    pub media_objetiva: Option<f64>,
}

/// Headline figures of the state ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumoRankingUf {
    /// State with the best objective mean
    pub melhor_uf: Option<String>,
    /// State with most participants
    pub maior_participacao: Option<String>,
    /// Results across states
    pub total_participantes: i64,
}

/// States ranked by essay then objective mean
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingUfResponse {
    /// States in rank order
    pub ranking: Vec<RankingUf>,
    /// Headline figures
    pub resumo: ResumoRankingUf,
}

/// Results with at least one score above the cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantesDestaqueResponse {
    /// Selection rule
    pub criterio: String,
    /// Cut-off score
    pub nota_corte: f64,
    /// Page of matching documents
    #[serde(flatten)]
    pub pagina: Paginated<Record<Resultado>>,
}

/// One essay score bracket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaixaRedacao {
    /// Bracket label
    pub faixa: &'static str,
    /// Lower bound, `None` for invalid scores
    pub nota_minima_faixa: Option<f64>,
    /// Upper bound, `None` for invalid scores
    pub nota_maxima_faixa: Option<f64>,
    /// Results in the bracket
    pub total: i64,
    /// Share of all results, in percent
    pub percentual: f64,
    /// Mean essay score
    pub media: Option<f64>,
    /// Lowest score
    pub minima: Option<f64>,
    /// Highest score
    pub maxima: Option<f64>,
}

/// Headline figures of the essay distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumoRedacao {
    /// Results counted
    pub total_resultados: i64,
    /// Results with a valid score
    pub total_validas: i64,
    /// Bracket with most results
    pub faixa_predominante: Option<&'static str>,
    /// Mean of the valid scores
    pub media_ponderada: Option<f64>,
}

/// Essay score distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistribuicaoRedacaoResponse {
    /// One entry per bracket
    pub faixas: Vec<FaixaRedacao>,
    /// Headline figures
    pub resumo: ResumoRedacao,
}

/// Results created within an interval
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstatisticasPeriodo {
    /// Lower bound as requested
    pub data_inicio: Option<DateTime<Utc>>,
    /// Upper bound as requested
    pub data_fim: Option<DateTime<Utc>>,
    /// Results counted
    pub total_resultados: i64,
    /// Mean score per area key
    pub medias: BTreeMap<&'static str, Option<f64>>,
}

/// Descending order with missing values last
fn desc_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn media_redacao(uf: &RankingUf) -> Option<f64> {
    uf.medias.get("redacao").copied().flatten()
}

fn faixa_redacao(nome: &'static str, bounds: Option<(f64, f64)>, row: Option<&RedacaoBracketRow>, total: i64) -> FaixaRedacao {
    let count = row.map_or(0, |r| r.total);
    FaixaRedacao {
        faixa: nome,
        nota_minima_faixa: bounds.map(|b| b.0),
        nota_maxima_faixa: bounds.map(|b| b.1),
        total: count,
        percentual: percentual(count, total),
        media: row.and_then(|r| r.media).map(round2),
        minima: row.and_then(|r| r.minima),
        maxima: row.and_then(|r| r.maxima),
    }
}

/// Result service
pub struct ResultadoService {
    repo: ResultadoRepository,
    crud: Crud<Resultado>,
}

impl ResultadoService {
    /// Service over the database's results
    pub fn new(db: &Database) -> Self {
        let repo = ResultadoRepository::new(db);
        let crud = Crud::new(repo.docs().clone(), MESSAGES);
        Self { repo, crud }
    }

    /// Shared CRUD operations
    pub fn crud(&self) -> &Crud<Resultado> {
        &self.crud
    }

    /// Store a result with its derived fields computed
    pub async fn criar(&self, resultado: Resultado) -> Result<Record<Resultado>, AppError> {
        self.crud.create(resultado.with_derived_fields()).await
    }

    /// Result of a participant
    pub async fn get_by_participante(&self, inscricao: &str) -> Result<Record<Resultado>, AppError> {
        self.crud
            .get_by(&ResultadoRepository::by_inscricao(inscricao), inscricao)
            .await
    }

    /// Result by natural key
    pub async fn get_by_sequencial(&self, nu_sequencial: &str) -> Result<Record<Resultado>, AppError> {
        self.crud
            .get_by(&ResultadoRepository::by_sequencial(nu_sequencial), nu_sequencial)
            .await
    }

    /// Filtered listing sorted by sequential number
    pub async fn listar(&self, filtros: &ResultadoFiltros, page: Page) -> Result<Paginated<Record<Resultado>>, AppError> {
        self.crud
            .list(&filtros.to_filter(), Sort::asc("nu_sequencial"), page)
            .await
    }

    /// Mean score and participation per area
    pub async fn medias_gerais(&self) -> MediasGeraisResponse {
        or_default("overall means", self.compute_medias_gerais().await)
    }

    async fn compute_medias_gerais(&self) -> Result<MediasGeraisResponse, StoreError> {
        let row = self.repo.medias_gerais().await?;
        let total = row.medias.total;
        let means = row.medias.means();

        let mut areas: Vec<MediaArea> = AREAS
            .iter()
            .zip(means)
            .zip(row.counts())
            .map(|((area, media), count)| MediaArea {
                codigo: area.codigo,
                area: area.nome_curto,
                chave: area.chave,
                media: media.map(round2),
                total_participantes: count,
                percentual_participacao: percentual(count, total),
            })
            .collect();
        areas.sort_by(|a, b| desc_opt(a.media, b.media));

        let objetivas = &means[..4];
        let media_geral_enem = if objetivas.iter().all(Option::is_some) {
            objective_mean(objetivas).map(round2)
        } else {
            None
        };

        info!("Computed overall means over {} results", total);
        Ok(MediasGeraisResponse {
            total_resultados: total,
            areas,
            media_geral_enem,
        })
    }

    /// Exam states ranked by essay mean, then objective mean
    pub async fn ranking_uf(&self) -> RankingUfResponse {
        or_default("state ranking", self.compute_ranking_uf().await)
    }

    async fn compute_ranking_uf(&self) -> Result<RankingUfResponse, StoreError> {
        let rows = self.repo.medias_por_uf().await?;

        let mut ranking: Vec<RankingUf> = rows
            .into_iter()
            .map(|r| {
                let means = r.medias.means();
                RankingUf {
                    posicao: 0,
                    uf: UfInfo {
                        nome: uf_nome(&r.uf),
                        sigla: r.uf,
                    },
                    total_participantes: r.medias.total,
                    medias: medias_por_area(&r.medias),
                    media_objetiva: objective_mean(&means[..4]).map(round2),
                }
            })
            .collect();

        ranking.sort_by(|a, b| {
            desc_opt(media_redacao(a), media_redacao(b))
                .then(desc_opt(a.media_objetiva, b.media_objetiva))
                .then(a.uf.sigla.cmp(&b.uf.sigla))
        });
        for (i, uf) in ranking.iter_mut().enumerate() {
            uf.posicao = i + 1;
        }

        let resumo = ResumoRankingUf {
            melhor_uf: ranking.first().map(|r| r.uf.sigla.clone()),
            maior_participacao: ranking
                .iter()
                .max_by(|a, b| {
                    a.total_participantes
                        .cmp(&b.total_participantes)
                        .then(b.posicao.cmp(&a.posicao))
                })
                .map(|r| r.uf.sigla.clone()),
            total_participantes: ranking.iter().map(|r| r.total_participantes).sum(),
        };

        info!("Ranked {} states", ranking.len());
        Ok(RankingUfResponse { ranking, resumo })
    }

    /// Results with any score `>= nota_corte`, best essays first
    pub async fn participantes_destaque(&self, nota_corte: f64, page: Page) -> ParticipantesDestaqueResponse {
        let filter = ResultadoRepository::destaque(nota_corte);
        let items = or_default(
            "highlighted results",
            self.repo
                .docs()
                .find(&filter, Sort::desc("nota_redacao"), Some(page))
                .await,
        );
        let total = or_default("highlighted results count", self.repo.docs().count(&filter).await);

        ParticipantesDestaqueResponse {
            criterio: format!("Pelo menos uma nota >= {}", nota_corte),
            nota_corte,
            pagina: Paginated::new(items, total, page),
        }
    }

    /// Essay scores per bracket, every bracket listed
    pub async fn distribuicao_redacao(&self) -> DistribuicaoRedacaoResponse {
        let rows = or_default("essay distribution", self.repo.distribuicao_redacao().await);
        let total: i64 = rows.iter().map(|r| r.total).sum();
        let by_faixa: BTreeMap<i64, &RedacaoBracketRow> = rows.iter().map(|r| (r.faixa, r)).collect();

        let mut faixas: Vec<FaixaRedacao> = REDACAO_BRACKETS
            .iter()
            .enumerate()
            .map(|(i, b)| faixa_redacao(b.nome, Some((b.min, b.max)), by_faixa.get(&(i as i64)).copied(), total))
            .collect();

        let total_validas: i64 = faixas.iter().map(|f| f.total).sum();
        let soma_validas: f64 = rows
            .iter()
            .filter(|r| r.faixa >= 0)
            .filter_map(|r| r.soma)
            .sum();
        let media_ponderada = if total_validas > 0 {
            Some(round2(soma_validas / total_validas as f64))
        } else {
            None
        };

        faixas.push(faixa_redacao(FAIXA_INVALIDAS, None, by_faixa.get(&-1).copied(), total));

        // ties go to the lower bracket, invalid scores last
        let faixa_predominante = faixas
            .iter()
            .enumerate()
            .filter(|(_, f)| f.total > 0)
            .max_by(|(i, a), (j, b)| a.total.cmp(&b.total).then(j.cmp(i)))
            .map(|(_, f)| f.faixa);

        DistribuicaoRedacaoResponse {
            faixas,
            resumo: ResumoRedacao {
                total_resultados: total,
                total_validas,
                faixa_predominante,
                media_ponderada,
            },
        }
    }

    /// Count and means of results created between the bounds
    ///
    /// The whole collection is used unless both bounds are given.
    pub async fn por_periodo(&self, data_inicio: Option<DateTime<Utc>>, data_fim: Option<DateTime<Utc>>) -> EstatisticasPeriodo {
        let filter = match (data_inicio, data_fim) {
            (Some(inicio), Some(fim)) => Filter::new().created_between(inicio, fim),
            _ => Filter::new(),
        };
        let row = or_default("period statistics", self.repo.medias_filtradas(&filter).await);
        EstatisticasPeriodo {
            data_inicio,
            data_fim,
            total_resultados: row.total,
            medias: medias_por_area(&row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resultado(seq: &str, uf: &str, notas: [Option<f64>; 5]) -> Resultado {
        Resultado {
            nu_sequencial: seq.to_string(),
            nu_ano: 2023,
            participante_inscricao: format!("2300{}", seq),
            uf_prova_sigla: Some(uf.to_string()),
            nota_cn: notas[0],
            nota_ch: notas[1],
            nota_lc: notas[2],
            nota_mt: notas[3],
            nota_redacao: notas[4],
            respostas_mt: Some("ABCDE".to_string()),
            gabarito_mt: Some("ABCCC".to_string()),
            ..Default::default()
        }
    }

    async fn seeded() -> ResultadoService {
        let db = Database::in_memory().await.unwrap();
        let service = ResultadoService::new(&db);
        for r in [
            resultado("1", "SP", [Some(500.0), Some(600.0), Some(550.0), Some(650.0), Some(900.0)]),
            resultado("2", "SP", [Some(400.0), Some(420.0), Some(450.0), Some(500.0), Some(600.0)]),
            resultado("3", "RJ", [Some(700.0), Some(710.0), Some(690.0), Some(800.0), Some(920.0)]),
            resultado("4", "BA", [None, None, None, None, None]),
        ] {
            service.criar(r).await.unwrap();
        }
        service
    }

    #[tokio::test]
    async fn test_criar_computes_derived_fields() {
        let service = seeded().await;
        let stored = service.get_by_sequencial("1").await.unwrap();
        assert_eq!(stored.doc.media_provas_objetivas, Some(575.0));
        assert_eq!(stored.doc.total_acertos, Some(3));

        let by_participante = service.get_by_participante("23001").await.unwrap();
        assert_eq!(by_participante.id, stored.id);
    }

    #[tokio::test]
    async fn test_medias_gerais() {
        let service = seeded().await;
        let medias = service.medias_gerais().await;
        assert_eq!(medias.total_resultados, 4);
        assert_eq!(medias.areas.len(), 5);
        assert_eq!(medias.areas[0].chave, "redacao");
        assert_eq!(medias.areas[0].percentual_participacao, 75.0);
        let sorted = medias
            .areas
            .windows(2)
            .all(|w| w[0].media >= w[1].media);
        assert!(sorted);
        assert!(medias.media_geral_enem.is_some());
    }

    #[tokio::test]
    async fn test_ranking_uf_orders_by_essay_mean() {
        let service = seeded().await;
        let ranking = service.ranking_uf().await;
        let siglas: Vec<&str> = ranking.ranking.iter().map(|r| r.uf.sigla.as_str()).collect();
        assert_eq!(siglas, vec!["RJ", "SP", "BA"]);
        assert_eq!(ranking.ranking[0].posicao, 1);
        assert_eq!(ranking.ranking[0].uf.nome, "Rio de Janeiro");
        assert_eq!(ranking.resumo.melhor_uf.as_deref(), Some("RJ"));
        assert_eq!(ranking.resumo.maior_participacao.as_deref(), Some("SP"));
        assert_eq!(ranking.resumo.total_participantes, 4);
    }

    #[tokio::test]
    async fn test_participantes_destaque() {
        let service = seeded().await;
        let destaque = service
            .participantes_destaque(NOTA_CORTE_DEFAULT, Page::new(0, 10))
            .await;
        assert_eq!(destaque.pagina.total, 2);
        assert_eq!(destaque.pagina.items[0].doc.nu_sequencial, "3");
        assert!(!destaque.pagina.has_more);
    }

    #[tokio::test]
    async fn test_distribuicao_redacao_lists_every_bracket() {
        let service = seeded().await;
        let dist = service.distribuicao_redacao().await;
        assert_eq!(dist.faixas.len(), REDACAO_BRACKETS.len() + 1);

        let excelente = dist.faixas.iter().find(|f| f.faixa == "Excelente").unwrap();
        assert_eq!(excelente.total, 2);
        assert_eq!(excelente.media, Some(910.0));

        let baixa = dist.faixas.iter().find(|f| f.faixa == "Baixa").unwrap();
        assert_eq!(baixa.total, 0);
        assert_eq!(baixa.media, None);

        let invalidas = dist.faixas.last().unwrap();
        assert_eq!(invalidas.faixa, FAIXA_INVALIDAS);
        assert_eq!(invalidas.total, 1);

        assert_eq!(dist.resumo.total_validas, 3);
        assert_eq!(dist.resumo.faixa_predominante, Some("Excelente"));
        assert_eq!(dist.resumo.media_ponderada, Some(806.67));
    }

    #[tokio::test]
    async fn test_distribuicao_redacao_uses_raw_scores() {
        let db = Database::in_memory().await.unwrap();
        let service = ResultadoService::new(&db);
        service
            .criar(resultado("1", "SP", [None, None, None, None, Some(500.004)]))
            .await
            .unwrap();
        service
            .criar(resultado("2", "SP", [None, None, None, None, Some(700.011)]))
            .await
            .unwrap();

        let dist = service.distribuicao_redacao().await;
        assert_eq!(dist.resumo.media_ponderada, Some(600.01));
    }

    #[tokio::test]
    async fn test_distribuicao_redacao_invalid_bracket_can_predominate() {
        let db = Database::in_memory().await.unwrap();
        let service = ResultadoService::new(&db);
        for (seq, nota) in [("1", None), ("2", None), ("3", Some(640.0))] {
            service
                .criar(resultado(seq, "PE", [None, None, None, None, nota]))
                .await
                .unwrap();
        }

        let dist = service.distribuicao_redacao().await;
        assert_eq!(dist.resumo.faixa_predominante, Some(FAIXA_INVALIDAS));
        assert_eq!(dist.resumo.total_validas, 1);
        assert_eq!(dist.resumo.media_ponderada, Some(640.0));
    }

    #[tokio::test]
    async fn test_por_periodo() {
        let service = seeded().await;
        let todos = service.por_periodo(None, None).await;
        assert_eq!(todos.total_resultados, 4);

        let passado = Utc::now() - chrono::Duration::days(30);
        let vazio = service
            .por_periodo(Some(passado - chrono::Duration::days(1)), Some(passado))
            .await;
        assert_eq!(vazio.total_resultados, 0);
        assert_eq!(vazio.medias["redacao"], None);

        let agora = service
            .por_periodo(Some(passado), Some(Utc::now() + chrono::Duration::days(1)))
            .await;
        assert_eq!(agora.total_resultados, 4);
    }
}
