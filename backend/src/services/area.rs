//! Knowledge areas and statistics over per participant and area scores

use super::{or_default, Crud, EntityMessages, Paginated};
use crate::error::AppError;
use crate::models::{area_info, AreaConhecimento, ParticipanteArea};
use crate::repositories::{AreaConhecimentoRepository, AreaGroupRow, ParticipanteAreaRepository};
use crate::stats::{percentual, round2, AREA_BRACKETS};
use crate::store::{Database, Filter, Page, Record, Sort, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

const MESSAGES: EntityMessages = EntityMessages {
    name: "area",
    not_found: "Área de conhecimento não encontrada",
    updated: "Área atualizada com sucesso",
    deleted: "Área deletada com sucesso",
};

/// Name reported for area codes missing from both the collection and the catalog
pub const AREA_DESCONHECIDA: &str = "Área não encontrada";
/// Default score threshold of the highlight listing
pub const NOTA_MINIMA_DEFAULT: f64 = 700.0;
/// Rows considered by an area ranking
pub const RANKING_CONSIDERADOS: u64 = 100;
/// Rows returned by an area ranking
pub const RANKING_RETORNADOS: usize = 50;

/// Aggregates of one area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaArea {
    /// Area code
    pub codigo: String,
    /// Area name
    pub nome: String,
    /// Mean score
    pub media_nota: Option<f64>,
    /// Participants counted
    pub total_participantes: i64,
    /// Highest score
    pub nota_maxima: Option<f64>,
    /// Lowest score included
    pub nota_minima: Option<f64>,
    /// Mean correct answers
    pub media_acertos: Option<f64>,
    /// Attendance rate, in percent
    pub taxa_presenca: f64,
}

/// Aggregates of every area
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstatisticasAreasResponse {
    /// Areas listed
    pub total_areas: usize,
    /// Per-area entries
    pub areas: Vec<EstatisticaArea>,
}

/// One area in the comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativoArea {
    /// Area code
    pub area_codigo: String,
    /// Area name
    pub nome: String,
    /// Mean score
    pub media_nota: Option<f64>,
    /// Participants counted
    pub total_participantes: i64,
    /// Highest score
    pub nota_maxima: Option<f64>,
    /// Lowest score included
    pub nota_minima: Option<f64>,
    /// Population standard deviation of the scores
    pub desvio_padrao: Option<f64>,
    /// Scores at or above the highlight cut-off
    pub participantes_destaque: i64,
    /// Highlight share, in percent
    pub taxa_destaque: f64,
    /// Attendance rate, in percent
    pub taxa_presenca: f64,
    /// Share of all area rows, in percent
    pub percentual_total: f64,
}

/// Comparison across areas
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparativoAreasResponse {
    /// Areas listed
    pub total_areas: usize,
    /// Area rows across every area
    pub total_participantes_geral: i64,
    /// Areas by descending mean
    pub areas: Vec<ComparativoArea>,
    /// Area with the highest mean
    pub area_melhor_media: Option<String>,
    /// Mean weighted by area rows
    pub media_geral: Option<f64>,
}

/// Rows of one area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantesAreaResponse {
    /// Area code
    pub area_codigo: String,
    /// Area name
    pub area_nome: String,
    /// Page of matching documents
    #[serde(flatten)]
    pub pagina: Paginated<Record<ParticipanteArea>>,
}

/// One position of an area ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosicaoRanking {
    /// 1-based rank
    pub posicao: usize,
    /// Enrollment number
    pub participante_inscricao: String,
    /// Score
    pub nota: Option<f64>,
    /// Correct answers
    pub numero_acertos: Option<i64>,
    /// Exam year
    pub ano_prova: i64,
}

/// Best scores of one area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingAreaResponse {
    /// Area code
    pub area_codigo: String,
    /// Area name
    pub area_nome: String,
    /// Exam year
    pub ano: Option<i64>,
    /// Scores ranked
    pub total_considerados: usize,
    /// Entries in rank order
    pub ranking: Vec<PosicaoRanking>,
}

/// Rows of one area at or above a score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestaqueAreaResponse {
    /// Area code
    pub area_codigo: String,
    /// Area name
    pub area_nome: String,
    /// Lowest score included
    pub nota_minima: f64,
    /// Page of matching documents
    #[serde(flatten)]
    pub pagina: Paginated<Record<ParticipanteArea>>,
}

/// One score bracket of an area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaixaNota {
    /// Bracket label
    pub faixa: &'static str,
    /// Scores in the bracket
    pub total_participantes: i64,
    /// Share of the total, in percent
    pub percentual: f64,
    /// Mean score in the bracket
    pub media_faixa: Option<f64>,
}

/// Score distribution of an area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistribuicaoNotasResponse {
    /// Area code
    pub area_codigo: String,
    /// Area name
    pub area_nome: String,
    /// Scores counted
    pub total_participantes: i64,
    /// One entry per bracket
    pub distribuicao: Vec<FaixaNota>,
    /// Bracket with most participants
    pub faixa_mais_comum: Option<&'static str>,
}

/// Every area row of one participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreasParticipanteResponse {
    /// Enrollment number
    pub participante_inscricao: String,
    /// Areas with a row
    pub total_areas: usize,
    /// Per-area entries
    pub areas: Vec<Record<ParticipanteArea>>,
    /// Mean of the area scores
    pub media_geral: Option<f64>,
    /// Area with the highest score
    pub melhor_area: Option<String>,
    /// Area with the lowest score
    pub pior_area: Option<String>,
}

/// Knowledge area service
pub struct AreaService {
    areas: AreaConhecimentoRepository,
    notas: ParticipanteAreaRepository,
    crud: Crud<AreaConhecimento>,
}

impl AreaService {
    /// Service over the database's areas and area scores
    pub fn new(db: &Database) -> Self {
        let areas = AreaConhecimentoRepository::new(db);
        let crud = Crud::new(areas.docs().clone(), MESSAGES);
        Self {
            areas,
            notas: ParticipanteAreaRepository::new(db),
            crud,
        }
    }

    /// Shared CRUD operations
    pub fn crud(&self) -> &Crud<AreaConhecimento> {
        &self.crud
    }

    /// Area by natural key
    pub async fn get_by_codigo(&self, codigo: &str) -> Result<Record<AreaConhecimento>, AppError> {
        self.crud
            .get_by(&AreaConhecimentoRepository::by_codigo(codigo), codigo)
            .await
    }

    /// Listing sorted by code
    pub async fn listar(&self, ativas_apenas: bool, peso_minimo: Option<f64>, page: Page) -> Result<Paginated<Record<AreaConhecimento>>, AppError> {
        self.crud
            .list(
                &AreaConhecimentoRepository::listagem(ativas_apenas, peso_minimo),
                Sort::asc("codigo"),
                page,
            )
            .await
    }

    /// Area names from the collection, falling back to the fixed catalog
    async fn nomes(&self) -> Result<HashMap<String, String>, StoreError> {
        let stored = self
            .areas
            .docs()
            .find(&Filter::new(), Sort::asc("codigo"), None)
            .await?;
        Ok(stored
            .into_iter()
            .map(|r| (r.doc.codigo, r.doc.nome))
            .collect())
    }

    fn nome_de(nomes: &HashMap<String, String>, codigo: &str) -> String {
        nomes
            .get(codigo)
            .cloned()
            .or_else(|| area_info(codigo).map(|a| a.nome.to_string()))
            .unwrap_or_else(|| AREA_DESCONHECIDA.to_string())
    }

    async fn nome_area(&self, codigo: &str) -> String {
        let nomes = or_default("area names", self.nomes().await);
        Self::nome_de(&nomes, codigo)
    }

    /// Mean, count, extremes, correct answers and attendance per area
    pub async fn estatisticas_gerais(&self) -> EstatisticasAreasResponse {
        or_default("area statistics", self.compute_gerais().await)
    }

    async fn compute_gerais(&self) -> Result<EstatisticasAreasResponse, StoreError> {
        let rows = self.notas.agregados_por_area().await?;
        let nomes = self.nomes().await?;
        let areas: Vec<EstatisticaArea> = rows
            .into_iter()
            .map(|r| EstatisticaArea {
                nome: Self::nome_de(&nomes, &r.area_codigo),
                media_nota: r.media.map(round2),
                total_participantes: r.total,
                nota_maxima: r.maxima,
                nota_minima: r.minima,
                media_acertos: r.media_acertos.map(round2),
                taxa_presenca: percentual(r.presentes, r.total),
                codigo: r.area_codigo,
            })
            .collect();
        info!("Computed statistics for {} areas", areas.len());
        Ok(EstatisticasAreasResponse {
            total_areas: areas.len(),
            areas,
        })
    }

    /// Side-by-side comparison of every area
    pub async fn comparativo(&self) -> ComparativoAreasResponse {
        or_default("area comparison", self.compute_comparativo().await)
    }

    async fn compute_comparativo(&self) -> Result<ComparativoAreasResponse, StoreError> {
        let mut rows: Vec<AreaGroupRow> = self.notas.agregados_por_area().await?;
        let nomes = self.nomes().await?;
        rows.sort_by(|a, b| {
            b.media
                .unwrap_or(f64::MIN)
                .total_cmp(&a.media.unwrap_or(f64::MIN))
        });

        let total_geral: i64 = rows.iter().map(|r| r.total).sum();
        let soma_ponderada: f64 = rows
            .iter()
            .filter_map(|r| r.media.map(|m| m * r.total as f64))
            .sum();
        let media_geral = if total_geral > 0 {
            Some(round2(soma_ponderada / total_geral as f64))
        } else {
            None
        };

        let areas: Vec<ComparativoArea> = rows
            .iter()
            .map(|r| ComparativoArea {
                area_codigo: r.area_codigo.clone(),
                nome: Self::nome_de(&nomes, &r.area_codigo),
                media_nota: r.media.map(round2),
                total_participantes: r.total,
                nota_maxima: r.maxima,
                nota_minima: r.minima,
                desvio_padrao: r.desvio_padrao().map(round2),
                participantes_destaque: r.destaques,
                taxa_destaque: percentual(r.destaques, r.total),
                taxa_presenca: percentual(r.presentes, r.total),
                percentual_total: percentual(r.total, total_geral),
            })
            .collect();

        Ok(ComparativoAreasResponse {
            total_areas: areas.len(),
            total_participantes_geral: total_geral,
            area_melhor_media: areas.first().map(|a| a.area_codigo.clone()),
            areas,
            media_geral,
        })
    }

    /// Rows of one area sorted by enrollment
    pub async fn participantes_area(&self, codigo: &str, page: Page) -> Result<ParticipantesAreaResponse, AppError> {
        let filter = ParticipanteAreaRepository::by_area(codigo);
        let items = self
            .notas
            .docs()
            .find(&filter, Sort::asc("participante_inscricao"), Some(page))
            .await?;
        let total = self.notas.docs().count(&filter).await?;
        Ok(ParticipantesAreaResponse {
            area_codigo: codigo.to_string(),
            area_nome: self.nome_area(codigo).await,
            pagina: Paginated::new(items, total, page),
        })
    }

    /// Best scores of one area, optionally within one exam year
    pub async fn ranking_area(&self, codigo: &str, ano: Option<i64>) -> RankingAreaResponse {
        let filter = ParticipanteAreaRepository::by_area(codigo)
            .not_null("nota")
            .eq_opt("ano_prova", ano);
        let top = or_default(
            "area ranking",
            self.notas
                .docs()
                .find(&filter, Sort::desc("nota"), Some(Page::new(0, RANKING_CONSIDERADOS)))
                .await,
        );

        let total_considerados = top.len();
        let ranking = top
            .into_iter()
            .take(RANKING_RETORNADOS)
            .enumerate()
            .map(|(i, r)| PosicaoRanking {
                posicao: i + 1,
                participante_inscricao: r.doc.participante_inscricao,
                nota: r.doc.nota,
                numero_acertos: r.doc.numero_acertos,
                ano_prova: r.doc.ano_prova,
            })
            .collect();

        RankingAreaResponse {
            area_codigo: codigo.to_string(),
            area_nome: self.nome_area(codigo).await,
            ano,
            total_considerados,
            ranking,
        }
    }

    /// Rows of one area with `nota >= nota_minima`, best first
    pub async fn destaque_area(&self, codigo: &str, nota_minima: f64, page: Page) -> DestaqueAreaResponse {
        let filter = ParticipanteAreaRepository::by_area(codigo).gte("nota", nota_minima);
        let items = or_default(
            "area highlights",
            self.notas
                .docs()
                .find(&filter, Sort::desc("nota"), Some(page))
                .await,
        );
        let total = or_default("area highlights count", self.notas.docs().count(&filter).await);

        DestaqueAreaResponse {
            area_codigo: codigo.to_string(),
            area_nome: self.nome_area(codigo).await,
            nota_minima,
            pagina: Paginated::new(items, total, page),
        }
    }

    /// Score brackets of one area with percentages
    pub async fn distribuicao_notas(&self, codigo: &str) -> DistribuicaoNotasResponse {
        let rows = or_default("area score distribution", self.notas.distribuicao(codigo).await);
        let fora = rows.iter().filter(|r| r.faixa < 0).map(|r| r.total).sum::<i64>();
        if fora > 0 {
            warn!("{} scores of area {} fall outside every bracket", fora, codigo);
        }

        let total: i64 = rows.iter().filter(|r| r.faixa >= 0).map(|r| r.total).sum();
        let distribuicao: Vec<FaixaNota> = AREA_BRACKETS
            .iter()
            .enumerate()
            .map(|(i, bracket)| {
                let row = rows.iter().find(|r| r.faixa == i as i64);
                let count = row.map_or(0, |r| r.total);
                FaixaNota {
                    faixa: bracket.nome,
                    total_participantes: count,
                    percentual: percentual(count, total),
                    media_faixa: row.and_then(|r| r.media).map(round2),
                }
            })
            .collect();

        let faixa_mais_comum = distribuicao
            .iter()
            .enumerate()
            .filter(|(_, f)| f.total_participantes > 0)
            .max_by(|(i, a), (j, b)| {
                a.total_participantes
                    .cmp(&b.total_participantes)
                    .then(j.cmp(i))
            })
            .map(|(_, f)| f.faixa);

        DistribuicaoNotasResponse {
            area_codigo: codigo.to_string(),
            area_nome: self.nome_area(codigo).await,
            total_participantes: total,
            distribuicao,
            faixa_mais_comum,
        }
    }

    /// Every area row of a participant with mean, best and worst area
    pub async fn areas_participante(&self, inscricao: &str) -> Result<AreasParticipanteResponse, AppError> {
        let areas = self
            .notas
            .docs()
            .find(
                &ParticipanteAreaRepository::by_participante(inscricao),
                Sort::asc("area_codigo"),
                None,
            )
            .await?;
        if areas.is_empty() {
            warn!("No area scores for participant {}", inscricao);
            return Err(AppError::NotFound(
                "Nenhuma área encontrada para o participante".to_string(),
            ));
        }

        let notas: Vec<(&str, f64)> = areas
            .iter()
            .filter_map(|r| r.doc.nota.map(|n| (r.doc.area_codigo.as_str(), n)))
            .collect();
        let media_geral = if notas.is_empty() {
            None
        } else {
            Some(round2(
                notas.iter().map(|(_, n)| n).sum::<f64>() / notas.len() as f64,
            ))
        };
        let melhor_area = notas
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c.to_string());
        let pior_area = notas
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c.to_string());

        Ok(AreasParticipanteResponse {
            participante_inscricao: inscricao.to_string(),
            total_areas: areas.len(),
            media_geral,
            melhor_area,
            pior_area,
            areas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AREAS;

    fn nota(inscricao: &str, area: &str, nota: Option<f64>, ano: i64) -> ParticipanteArea {
        ParticipanteArea {
            participante_inscricao: inscricao.to_string(),
            area_codigo: area.to_string(),
            ano_prova: ano,
            nota,
            presenca: nota.is_some(),
            numero_acertos: nota.map(|n| (n / 20.0) as i64),
            codigo_prova: None,
        }
    }

    async fn seeded() -> AreaService {
        let db = Database::in_memory().await.unwrap();
        let service = AreaService::new(&db);
        for area in AREAS.iter() {
            service.crud().create(AreaConhecimento::from(area)).await.unwrap();
        }
        let notas = ParticipanteAreaRepository::new(&db);
        for r in [
            nota("A", "MT", Some(800.0), 2023),
            nota("B", "MT", Some(600.0), 2023),
            nota("C", "MT", Some(720.0), 2022),
            nota("A", "CN", Some(500.0), 2023),
            nota("B", "CN", None, 2023),
            nota("A", "RE", Some(940.0), 2023),
        ] {
            notas.docs().insert(r).await.unwrap();
        }
        service
    }

    #[tokio::test]
    async fn test_estatisticas_gerais_names_areas() {
        let service = seeded().await;
        let stats = service.estatisticas_gerais().await;
        assert_eq!(stats.total_areas, 3);
        let cn = stats.areas.iter().find(|a| a.codigo == "CN").unwrap();
        assert_eq!(cn.total_participantes, 1);
        assert_eq!(cn.nome, "Ciências da Natureza e suas Tecnologias");
        assert_eq!(cn.taxa_presenca, 100.0);
    }

    #[tokio::test]
    async fn test_comparativo() {
        let service = seeded().await;
        let comp = service.comparativo().await;
        assert_eq!(comp.total_participantes_geral, 5);
        assert_eq!(comp.area_melhor_media.as_deref(), Some("RE"));
        let mt = comp.areas.iter().find(|a| a.area_codigo == "MT").unwrap();
        assert_eq!(mt.participantes_destaque, 2);
        assert_eq!(mt.taxa_destaque, 66.67);
        assert_eq!(mt.percentual_total, 60.0);
        // (800 + 600 + 720 + 500 + 940) / 5
        assert_eq!(comp.media_geral, Some(712.0));
    }

    #[tokio::test]
    async fn test_ranking_and_destaque() {
        let service = seeded().await;
        let ranking = service.ranking_area("MT", None).await;
        assert_eq!(ranking.total_considerados, 3);
        assert_eq!(ranking.ranking[0].participante_inscricao, "A");
        assert_eq!(ranking.ranking[0].posicao, 1);

        let ano = service.ranking_area("MT", Some(2022)).await;
        assert_eq!(ano.total_considerados, 1);

        let destaque = service
            .destaque_area("MT", NOTA_MINIMA_DEFAULT, Page::new(0, 10))
            .await;
        assert_eq!(destaque.pagina.total, 2);
        assert_eq!(destaque.pagina.items[1].doc.nota, Some(720.0));
    }

    #[tokio::test]
    async fn test_distribuicao_notas() {
        let service = seeded().await;
        let dist = service.distribuicao_notas("MT").await;
        assert_eq!(dist.total_participantes, 3);
        assert_eq!(dist.distribuicao.len(), AREA_BRACKETS.len());
        let soma: f64 = dist.distribuicao.iter().map(|f| f.percentual).sum();
        assert!((soma - 100.0).abs() < 0.1);
        // 600, 720 and 800 land in three different brackets; ties go to the lowest
        assert_eq!(dist.faixa_mais_comum, Some("600-700"));
        assert_eq!(dist.area_nome, "Matemática e suas Tecnologias");
    }

    #[tokio::test]
    async fn test_areas_participante() {
        let service = seeded().await;
        let areas = service.areas_participante("A").await.unwrap();
        assert_eq!(areas.total_areas, 3);
        assert_eq!(areas.melhor_area.as_deref(), Some("RE"));
        assert_eq!(areas.pior_area.as_deref(), Some("CN"));
        assert_eq!(areas.media_geral, Some(746.67));

        let missing = service.areas_participante("Z").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listar_ativas() {
        let service = seeded().await;
        let rec = service.get_by_codigo("LC").await.unwrap();
        let update = crate::models::AreaConhecimentoUpdate {
            ativa: Some(false),
            ..Default::default()
        };
        service.crud().update(&rec.id, &update).await.unwrap();

        let ativas = service.listar(true, None, Page::new(0, 100)).await.unwrap();
        assert_eq!(ativas.total, 4);
        let todas = service.listar(false, None, Page::new(0, 100)).await.unwrap();
        assert_eq!(todas.total, 5);
        assert_eq!(todas.items[0].doc.codigo, "CH");
    }
}
