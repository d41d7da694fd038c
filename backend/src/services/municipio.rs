//! Municipality operations and regional statistics

use super::{or_default, Crud, EntityMessages, Paginated};
use crate::error::AppError;
use crate::models::Municipio;
use crate::repositories::MunicipioRepository;
use crate::stats::{percentual, round2};
use crate::store::{Database, Filter, Page, Record, Sort, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

const MESSAGES: EntityMessages = EntityMessages {
    name: "municipio",
    not_found: "Município não encontrado",
    updated: "Município atualizado com sucesso",
    deleted: "Município deletado com sucesso",
};

/// Label for municipalities without a region
pub const REGIAO_NAO_INFORMADA: &str = "Não informada";

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct MunicipioFiltros {
    /// State abbreviation
    pub uf_sigla: Option<String>,
    /// Region name
    pub regiao: Option<String>,
}

/// Statistics of one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaRegiao {
    /// Geographic region
    pub regiao: String,
    /// Municipalities counted
    pub total_municipios: i64,
    /// Share of the total, in percent
    pub percentual: f64,
    /// Summed population
    pub populacao_total: Option<i64>,
    /// Mean population
    pub populacao_media: Option<f64>,
    /// Mean GDP per capita
    pub pib_per_capita_medio: Option<f64>,
    /// Mean HDI
    pub idh_medio: Option<f64>,
    /// Most populous municipality
    pub maior_municipio: Option<String>,
    /// Least populous municipality
    pub menor_municipio: Option<String>,
}

/// Totals across every region
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumoGeralMunicipios {
    /// Municipalities counted
    pub total_municipios: i64,
    /// Summed population
    pub total_populacao: Option<i64>,
    /// Municipality count per state
    pub municipios_por_uf: BTreeMap<String, i64>,
    /// Region with most municipalities
    pub regiao_com_mais_municipios: Option<String>,
}

/// Response of the regional statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstatisticasRegiaoResponse {
    /// One entry per region
    pub estatisticas_por_regiao: Vec<EstatisticaRegiao>,
    /// Totals across regions
    pub resumo_geral: ResumoGeralMunicipios,
    /// Regions listed
    pub total_regioes: usize,
}

/// Municipality service
pub struct MunicipioService {
    repo: MunicipioRepository,
    crud: Crud<Municipio>,
}

fn regiao_nome(regiao: Option<String>) -> String {
    regiao.unwrap_or_else(|| REGIAO_NAO_INFORMADA.to_string())
}

impl MunicipioService {
    /// Service over the database's municipalities
    pub fn new(db: &Database) -> Self {
        let repo = MunicipioRepository::new(db);
        let crud = Crud::new(repo.docs().clone(), MESSAGES);
        Self { repo, crud }
    }

    /// Shared CRUD operations
    pub fn crud(&self) -> &Crud<Municipio> {
        &self.crud
    }

    /// Municipality by IBGE code
    pub async fn get_by_codigo(&self, codigo: i64) -> Result<Record<Municipio>, AppError> {
        self.crud
            .get_by(&MunicipioRepository::by_codigo(codigo), codigo)
            .await
    }

    /// Filtered listing sorted by name
    pub async fn listar(&self, filtros: &MunicipioFiltros, page: Page) -> Result<Paginated<Record<Municipio>>, AppError> {
        let filter = Filter::new()
            .eq_opt("uf_sigla", filtros.uf_sigla.clone())
            .eq_opt("regiao", filtros.regiao.clone());
        self.crud.list(&filter, Sort::asc("nome"), page).await
    }

    /// Per-region counts and means with an overall summary
    pub async fn estatisticas_por_regiao(&self) -> EstatisticasRegiaoResponse {
        or_default("region statistics", self.compute_estatisticas_por_regiao().await)
    }

    async fn compute_estatisticas_por_regiao(&self) -> Result<EstatisticasRegiaoResponse, StoreError> {
        let rows = self.repo.estatisticas_por_regiao().await?;
        let maiores: HashMap<String, String> = self
            .repo
            .extremos_populacao(true)
            .await?
            .into_iter()
            .map(|r| (regiao_nome(r.regiao), r.nome))
            .collect();
        let menores: HashMap<String, String> = self
            .repo
            .extremos_populacao(false)
            .await?
            .into_iter()
            .map(|r| (regiao_nome(r.regiao), r.nome))
            .collect();
        let municipios_por_uf: BTreeMap<String, i64> = self
            .repo
            .contagem_por_uf()
            .await?
            .into_iter()
            .filter_map(|r| r.uf.map(|uf| (uf, r.total)))
            .collect();

        let total_municipios: i64 = rows.iter().map(|r| r.total_municipios).sum();
        let populacoes: Vec<i64> = rows.iter().filter_map(|r| r.populacao_total).collect();
        let total_populacao = if populacoes.is_empty() {
            None
        } else {
            Some(populacoes.iter().sum())
        };

        let estatisticas: Vec<EstatisticaRegiao> = rows
            .into_iter()
            .map(|row| {
                let regiao = regiao_nome(row.regiao);
                EstatisticaRegiao {
                    total_municipios: row.total_municipios,
                    percentual: percentual(row.total_municipios, total_municipios),
                    populacao_total: row.populacao_total,
                    populacao_media: row.populacao_media.map(round2),
                    pib_per_capita_medio: row.pib_per_capita_medio.map(round2),
                    idh_medio: row.idh_medio.map(|v| (v * 1000.0).round() / 1000.0),
                    maior_municipio: maiores.get(&regiao).cloned(),
                    menor_municipio: menores.get(&regiao).cloned(),
                    regiao,
                }
            })
            .collect();

        // rows arrive ordered by count, so the first region is the largest
        let regiao_com_mais_municipios = estatisticas.first().map(|e| e.regiao.clone());
        info!(
            "Computed region statistics: {} regions, {} municipalities",
            estatisticas.len(),
            total_municipios
        );

        Ok(EstatisticasRegiaoResponse {
            total_regioes: estatisticas.len(),
            resumo_geral: ResumoGeralMunicipios {
                total_municipios,
                total_populacao,
                municipios_por_uf,
                regiao_com_mais_municipios,
            },
            estatisticas_por_regiao: estatisticas,
        })
    }
}
