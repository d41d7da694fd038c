//! School operations, breakdowns and the performance ranking

use super::{medias_por_area, or_default, Crud, EntityMessages, Paginated};
use crate::error::AppError;
use crate::models::Escola;
use crate::repositories::{EscolaGroupRow, EscolaRepository};
use crate::stats::{dependencia_label, localizacao_label, percentual, round2, situacao_label, uf_nome};
use crate::store::{Database, Filter, Page, Record, Sort};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const MESSAGES: EntityMessages = EntityMessages {
    name: "escola",
    not_found: "Escola não encontrada",
    updated: "Escola atualizada com sucesso",
    deleted: "Escola deletada com sucesso",
};

/// Default number of schools returned by the name search
pub const BUSCA_LIMIT_DEFAULT: u64 = 20;
/// Default size of the participants top list
pub const TOP_LIMIT_DEFAULT: u64 = 10;
/// Default size of the performance ranking
pub const RANKING_LIMIT_DEFAULT: usize = 50;

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct EscolaFiltros {
    /// State abbreviation
    pub uf: Option<String>,
    /// Municipality code
    pub municipio_codigo: Option<i64>,
    /// Administrative dependency code
    pub dependencia_administrativa: Option<i64>,
    /// Location code
    pub localizacao: Option<i64>,
    /// Operating status code
    pub situacao_funcionamento: Option<i64>,
}

impl EscolaFiltros {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("uf_sigla", self.uf.clone())
            .eq_opt("municipio_codigo", self.municipio_codigo)
            .eq_opt("dependencia_administrativa", self.dependencia_administrativa)
            .eq_opt("localizacao", self.localizacao)
            .eq_opt("situacao_funcionamento", self.situacao_funcionamento)
    }
}

/// Schools of one administrative dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaDependencia {
    /// Dependency code
    pub codigo: Option<i64>,
    /// Dependency label
    pub dependencia: String,
    /// Schools counted
    pub total_escolas: i64,
    /// Participants counted
    pub total_participantes: i64,
    /// Mean participants per school
    pub media_participantes: Option<f64>,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// Schools of one state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaUfEscolas {
    /// State abbreviation
    pub uf: String,
    /// State name
    pub uf_nome: String,
    /// Schools counted
    pub total_escolas: i64,
    /// Participants counted
    pub total_participantes: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// Schools of one location type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaLocalizacao {
    /// Location code
    pub codigo: Option<i64>,
    /// Location label
    pub localizacao: String,
    /// Schools counted
    pub total_escolas: i64,
    /// Participants counted
    pub total_participantes: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// One school of the performance ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEscola {
    /// 1-based rank
    pub posicao: usize,
    /// INEP school code
    pub codigo: i64,
    /// School name
    pub nome: Option<String>,
    /// IBGE municipality code
    pub municipio_codigo: Option<i64>,
    /// State abbreviation
    pub uf_sigla: Option<String>,
    /// Dependency label
    pub dependencia: String,
    /// Operating status code
    pub situacao: String,
    /// Results of the school
    pub total_resultados: i64,
    /// Mean score per area key
    pub medias: BTreeMap<&'static str, Option<f64>>,
    /// Mean of the area means
    pub media_geral: f64,
}

/// Result aggregates of one school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticasResultadosEscola {
    /// Results counted
    pub total_resultados: i64,
    /// Mean score per area key
    pub medias: BTreeMap<&'static str, Option<f64>>,
}

/// A school with its result aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticasEscolaResponse {
    /// The school
    pub escola: Record<Escola>,
    /// Result aggregates
    pub estatisticas: EstatisticasResultadosEscola,
}

/// Mean of the available per-area means
fn media_das_medias(means: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = means.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn total_escolas(rows: &[EscolaGroupRow]) -> i64 {
    rows.iter().map(|r| r.total_escolas).sum()
}

/// School service
pub struct EscolaService {
    repo: EscolaRepository,
    crud: Crud<Escola>,
}

impl EscolaService {
    /// Service over the database's schools
    pub fn new(db: &Database) -> Self {
        let repo = EscolaRepository::new(db);
        let crud = Crud::new(repo.docs().clone(), MESSAGES);
        Self { repo, crud }
    }

    /// Shared CRUD operations
    pub fn crud(&self) -> &Crud<Escola> {
        &self.crud
    }

    /// School by natural key
    pub async fn get_by_codigo(&self, codigo: i64) -> Result<Record<Escola>, AppError> {
        self.crud
            .get_by(&EscolaRepository::by_codigo(codigo), codigo)
            .await
    }

    /// Filtered listing sorted by name
    pub async fn listar(&self, filtros: &EscolaFiltros, page: Page) -> Result<Paginated<Record<Escola>>, AppError> {
        self.crud
            .list(&filtros.to_filter(), Sort::asc("nome"), page)
            .await
    }

    /// Case-insensitive search by partial name
    pub async fn buscar_por_nome(&self, nome: &str, limit: u64) -> Result<Vec<Record<Escola>>, AppError> {
        let filter = Filter::new().contains("nome", nome);
        let escolas = self
            .repo
            .docs()
            .find(&filter, Sort::asc("nome"), Some(Page::new(0, limit)))
            .await?;
        info!("Found {} schools matching '{}'", escolas.len(), nome);
        Ok(escolas)
    }

    /// Schools per administrative dependency, optionally within one state
    pub async fn por_dependencia(&self, uf: Option<&str>) -> Vec<EstatisticaDependencia> {
        let rows = or_default("schools by dependency", self.repo.por_dependencia(uf).await);
        let total = total_escolas(&rows);
        rows.into_iter()
            .map(|r| EstatisticaDependencia {
                dependencia: r
                    .codigo
                    .map_or("Não informado", dependencia_label)
                    .to_string(),
                codigo: r.codigo,
                total_escolas: r.total_escolas,
                total_participantes: r.total_participantes,
                media_participantes: r.media_participantes.map(round2),
                percentual: percentual(r.total_escolas, total),
            })
            .collect()
    }

    /// Schools and participants per state
    pub async fn por_uf(&self) -> Vec<EstatisticaUfEscolas> {
        let rows = or_default("schools by state", self.repo.por_uf().await);
        let total = total_escolas(&rows);
        rows.into_iter()
            .filter_map(|r| {
                let uf = r.chave?;
                Some(EstatisticaUfEscolas {
                    uf_nome: uf_nome(&uf),
                    uf,
                    total_escolas: r.total_escolas,
                    total_participantes: r.total_participantes,
                    percentual: percentual(r.total_escolas, total),
                })
            })
            .collect()
    }

    /// Urban and rural school counts
    pub async fn por_localizacao(&self) -> Vec<EstatisticaLocalizacao> {
        let rows = or_default("schools by location", self.repo.por_localizacao().await);
        let total = total_escolas(&rows);
        rows.into_iter()
            .map(|r| EstatisticaLocalizacao {
                localizacao: r
                    .codigo
                    .map_or("Não informado", localizacao_label)
                    .to_string(),
                codigo: r.codigo,
                total_escolas: r.total_escolas,
                total_participantes: r.total_participantes,
                percentual: percentual(r.total_escolas, total),
            })
            .collect()
    }

    /// Schools with the most participants
    pub async fn top_participantes(&self, limit: u64) -> Vec<Record<Escola>> {
        or_default("top schools", self.repo.top_participantes(limit).await)
    }

    /// Schools ranked by the mean of their per-area means
    pub async fn ranking_desempenho(&self, limit: usize) -> Vec<RankingEscola> {
        let rows = or_default("school ranking", self.repo.ranking_base().await);

        let mut ranking: Vec<RankingEscola> = rows
            .into_iter()
            .filter_map(|r| {
                let media_geral = media_das_medias(&r.medias.means())?;
                Some(RankingEscola {
                    posicao: 0,
                    codigo: r.codigo,
                    nome: r.nome,
                    municipio_codigo: r.municipio_codigo,
                    uf_sigla: r.uf_sigla,
                    dependencia: r
                        .dependencia_administrativa
                        .map_or("Não informado", dependencia_label)
                        .to_string(),
                    situacao: r
                        .situacao_funcionamento
                        .map_or("Não informado", situacao_label)
                        .to_string(),
                    total_resultados: r.medias.total,
                    medias: medias_por_area(&r.medias),
                    media_geral: round2(media_geral),
                })
            })
            .collect();

        ranking.sort_by(|a, b| {
            b.media_geral
                .total_cmp(&a.media_geral)
                .then(a.codigo.cmp(&b.codigo))
        });
        ranking.truncate(limit);
        for (i, escola) in ranking.iter_mut().enumerate() {
            escola.posicao = i + 1;
        }
        info!("Ranked {} schools by performance", ranking.len());
        ranking
    }

    /// A school and the aggregates of its results
    pub async fn estatisticas_escola(&self, codigo: i64) -> Result<EstatisticasEscolaResponse, AppError> {
        let escola = self.get_by_codigo(codigo).await?;
        let medias = self.compute_medias(codigo).await;
        Ok(EstatisticasEscolaResponse {
            escola,
            estatisticas: medias,
        })
    }

    async fn compute_medias(&self, codigo: i64) -> EstatisticasResultadosEscola {
        let row = or_default("school statistics", self.repo.medias_escola(codigo).await);
        EstatisticasResultadosEscola {
            total_resultados: row.total,
            medias: medias_por_area(&row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resultado;
    use crate::repositories::ResultadoRepository;

    fn escola(codigo: i64, nome: &str, uf: &str, dependencia: i64, localizacao: i64, participantes: i64) -> Escola {
        Escola {
            codigo,
            nome: Some(nome.to_string()),
            municipio_codigo: 3550308,
            uf_codigo: 35,
            uf_sigla: uf.to_string(),
            dependencia_administrativa: dependencia,
            localizacao,
            situacao_funcionamento: 1,
            total_participantes: participantes,
        }
    }

    fn resultado(seq: usize, escola_codigo: i64, nota: f64) -> Resultado {
        Resultado {
            nu_sequencial: format!("{}-{}", escola_codigo, seq),
            nu_ano: 2023,
            participante_inscricao: format!("P{}-{}", escola_codigo, seq),
            escola_codigo: Some(escola_codigo),
            nota_cn: Some(nota),
            nota_mt: Some(nota + 100.0),
            ..Default::default()
        }
    }

    async fn seeded() -> (Database, EscolaService) {
        let db = Database::in_memory().await.unwrap();
        let service = EscolaService::new(&db);
        for e in [
            escola(1, "Colégio Estadual Alfa", "SP", 2, 1, 30),
            escola(2, "Escola Municipal Beta", "SP", 3, 2, 0),
            escola(3, "Colégio Gama", "RJ", 4, 1, 12),
            escola(4, "Instituto Federal Delta", "RJ", 1, 1, 5),
        ] {
            service.crud().create(e).await.unwrap();
        }
        (db, service)
    }

    #[tokio::test]
    async fn test_breakdowns() {
        let (_db, service) = seeded().await;

        let dependencias = service.por_dependencia(None).await;
        assert_eq!(dependencias.len(), 4);
        let total: f64 = dependencias.iter().map(|d| d.percentual).sum();
        assert!((total - 100.0).abs() < 0.1);

        let sp = service.por_dependencia(Some("SP")).await;
        assert_eq!(sp.len(), 2);

        let ufs = service.por_uf().await;
        let rj = ufs.iter().find(|u| u.uf == "RJ").unwrap();
        assert_eq!(rj.total_participantes, 17);
        assert_eq!(rj.uf_nome, "Rio de Janeiro");

        let localizacoes = service.por_localizacao().await;
        assert_eq!(localizacoes[0].localizacao, "Urbana");
        assert_eq!(localizacoes[0].total_escolas, 3);
        assert_eq!(localizacoes[0].percentual, 75.0);
    }

    #[tokio::test]
    async fn test_top_participantes_skips_empty_schools() {
        let (_db, service) = seeded().await;
        let top = service.top_participantes(10).await;
        let codigos: Vec<i64> = top.iter().map(|r| r.doc.codigo).collect();
        assert_eq!(codigos, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_busca_por_nome_is_case_insensitive() {
        let (_db, service) = seeded().await;
        let found = service.buscar_por_nome("colégio", 20).await.unwrap();
        assert_eq!(found.len(), 2);
        let found = service.buscar_por_nome("BETA", 20).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_ranking_requires_minimum_results() {
        let (db, service) = seeded().await;
        let resultados = ResultadoRepository::new(&db);
        for i in 0..5 {
            resultados.docs().insert(resultado(i, 1, 500.0)).await.unwrap();
            resultados.docs().insert(resultado(i, 3, 600.0)).await.unwrap();
        }
        for i in 0..4 {
            resultados.docs().insert(resultado(i, 4, 900.0)).await.unwrap();
        }

        let ranking = service.ranking_desempenho(RANKING_LIMIT_DEFAULT).await;
        let codigos: Vec<i64> = ranking.iter().map(|r| r.codigo).collect();
        assert_eq!(codigos, vec![3, 1]);
        assert_eq!(ranking[0].posicao, 1);
        assert_eq!(ranking[0].media_geral, 650.0);
        assert_eq!(ranking[0].total_resultados, 5);

        assert_eq!(service.ranking_desempenho(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_estatisticas_escola() {
        let (db, service) = seeded().await;
        let resultados = ResultadoRepository::new(&db);
        resultados.docs().insert(resultado(0, 2, 400.0)).await.unwrap();
        resultados.docs().insert(resultado(1, 2, 600.0)).await.unwrap();

        let stats = service.estatisticas_escola(2).await.unwrap();
        assert_eq!(stats.escola.doc.codigo, 2);
        assert_eq!(stats.estatisticas.total_resultados, 2);
        assert_eq!(stats.estatisticas.medias["ciencias_natureza"], Some(500.0));
        assert_eq!(stats.estatisticas.medias["matematica"], Some(600.0));
        assert_eq!(stats.estatisticas.medias["redacao"], None);

        let missing = service.estatisticas_escola(999).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
