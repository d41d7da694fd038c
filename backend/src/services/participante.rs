//! Participant operations and demographic breakdowns

use super::{or_default, Crud, EntityMessages, Paginated};
use crate::error::AppError;
use crate::models::Participante;
use crate::repositories::{ParticipanteGroupRow, ParticipanteRepository};
use crate::stats::{cor_raca_label, faixa_etaria_label, percentual, sexo_label, uf_nome};
use crate::store::{Database, Filter, Page, Record, Sort, StoreError};
use serde::Serialize;
use tracing::info;

const MESSAGES: EntityMessages = EntityMessages {
    name: "participante",
    not_found: "Participante não encontrado",
    updated: "Participante atualizado com sucesso",
    deleted: "Participante deletado com sucesso",
};

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ParticipanteFiltros {
    /// Exam year
    pub ano: Option<i64>,
    /// "M" or "F"
    pub sexo: Option<String>,
    /// Exam state abbreviation
    pub uf_prova: Option<String>,
    /// Exam municipality code
    pub municipio_prova_codigo: Option<i64>,
    /// Trainee flag
    pub treineiro: Option<bool>,
    /// Lowest age bracket (inclusive)
    pub faixa_etaria_min: Option<i64>,
    /// Highest age bracket (inclusive)
    pub faixa_etaria_max: Option<i64>,
}

impl ParticipanteFiltros {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("nu_ano", self.ano)
            .eq_opt("sexo", self.sexo.clone())
            .eq_opt("uf_prova", self.uf_prova.clone())
            .eq_opt("municipio_prova_codigo", self.municipio_prova_codigo)
            .eq_opt("treineiro", self.treineiro)
            .gte_opt("faixa_etaria", self.faixa_etaria_min)
            .lte_opt("faixa_etaria", self.faixa_etaria_max)
    }
}

/// Participants of one sex
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrupoSexo {
    /// Sex (M or F)
    pub sexo: Option<String>,
    /// Human-readable label
    pub descricao: String,
    /// Participants in the group
    pub total: i64,
    /// Trainees in the group
    pub treineiros: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// Participants of one age bracket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrupoFaixaEtaria {
    /// Age bracket code
    pub faixa_etaria: Option<i64>,
    /// Human-readable label
    pub descricao: String,
    /// Participants in the group
    pub total: i64,
    /// Trainees in the group
    pub treineiros: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// Participants of one race/ethnicity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrupoCorRaca {
    /// Race/ethnicity code
    pub cor_raca: Option<i64>,
    /// Human-readable label
    pub descricao: String,
    /// Participants in the group
    pub total: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// Demographic breakdowns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstatisticasDemograficas {
    /// Participants counted
    pub total_participantes: i64,
    /// Breakdown by sex
    pub por_sexo: Vec<GrupoSexo>,
    /// Breakdown by age bracket
    pub por_faixa_etaria: Vec<GrupoFaixaEtaria>,
    /// Breakdown by race/ethnicity
    pub por_cor_raca: Vec<GrupoCorRaca>,
}

/// Participants of one exam state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticaUfParticipantes {
    /// State abbreviation
    pub uf: String,
    /// State name
    pub uf_nome: String,
    /// Participants counted
    pub total_participantes: i64,
    /// Trainees in the group
    pub treineiros: i64,
    /// Trainee share, in percent
    pub percentual_treineiros: f64,
    /// Share of the total, in percent
    pub percentual: f64,
}

/// One age bracket of the age distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistribuicaoIdade {
    /// Age bracket code
    pub faixa_etaria: Option<i64>,
    /// Human-readable label
    pub descricao: String,
    /// Participants in the bracket
    pub total: i64,
    /// Share of the total, in percent
    pub percentual: f64,
}

fn total_de(rows: &[ParticipanteGroupRow]) -> i64 {
    rows.iter().map(|r| r.total).sum()
}

fn faixa_descricao(codigo: Option<i64>) -> String {
    codigo.map_or_else(|| "Não informado".to_string(), faixa_etaria_label)
}

/// Participant service
pub struct ParticipanteService {
    repo: ParticipanteRepository,
    crud: Crud<Participante>,
}

impl ParticipanteService {
    /// Service over the database's participants
    pub fn new(db: &Database) -> Self {
        let repo = ParticipanteRepository::new(db);
        let crud = Crud::new(repo.docs().clone(), MESSAGES);
        Self { repo, crud }
    }

    /// Shared CRUD operations
    pub fn crud(&self) -> &Crud<Participante> {
        &self.crud
    }

    /// Participant by enrollment number
    pub async fn get_by_inscricao(&self, nu_inscricao: &str) -> Result<Record<Participante>, AppError> {
        self.crud
            .get_by(&ParticipanteRepository::by_inscricao(nu_inscricao), nu_inscricao)
            .await
    }

    /// Filtered listing sorted by enrollment number
    pub async fn listar(&self, filtros: &ParticipanteFiltros, page: Page) -> Result<Paginated<Record<Participante>>, AppError> {
        self.crud
            .list(&filtros.to_filter(), Sort::asc("nu_inscricao"), page)
            .await
    }

    /// Breakdowns by sex, age bracket and race/ethnicity
    pub async fn demograficas(&self) -> EstatisticasDemograficas {
        or_default("demographic statistics", self.compute_demograficas().await)
    }

    async fn compute_demograficas(&self) -> Result<EstatisticasDemograficas, StoreError> {
        let sexo = self.repo.por_sexo().await?;
        let faixas = self.repo.por_faixa_etaria().await?;
        let cores = self.repo.por_cor_raca().await?;
        let total = total_de(&sexo);

        info!("Computed demographic statistics over {} participants", total);
        Ok(EstatisticasDemograficas {
            total_participantes: total,
            por_sexo: sexo
                .into_iter()
                .map(|r| GrupoSexo {
                    descricao: sexo_label(r.chave.as_deref().unwrap_or_default()).to_string(),
                    sexo: r.chave,
                    total: r.total,
                    treineiros: r.treineiros,
                    percentual: percentual(r.total, total),
                })
                .collect(),
            por_faixa_etaria: faixas
                .into_iter()
                .map(|r| GrupoFaixaEtaria {
                    descricao: faixa_descricao(r.codigo),
                    faixa_etaria: r.codigo,
                    total: r.total,
                    treineiros: r.treineiros,
                    percentual: percentual(r.total, total),
                })
                .collect(),
            por_cor_raca: cores
                .into_iter()
                .map(|r| GrupoCorRaca {
                    descricao: r
                        .codigo
                        .map_or("Não informado", cor_raca_label)
                        .to_string(),
                    cor_raca: r.codigo,
                    total: r.total,
                    percentual: percentual(r.total, total),
                })
                .collect(),
        })
    }

    /// Participants and trainees per exam state
    pub async fn por_uf(&self, uf: Option<&str>) -> Vec<EstatisticaUfParticipantes> {
        let rows = or_default("participants by state", self.repo.por_uf_prova(uf).await);
        let total = total_de(&rows);
        rows.into_iter()
            .filter_map(|r| {
                let uf = r.chave?;
                Some(EstatisticaUfParticipantes {
                    uf_nome: uf_nome(&uf),
                    uf,
                    total_participantes: r.total,
                    treineiros: r.treineiros,
                    percentual_treineiros: percentual(r.treineiros, r.total),
                    percentual: percentual(r.total, total),
                })
            })
            .collect()
    }

    /// Participants per age bracket in bracket order
    pub async fn distribuicao_idade(&self) -> Vec<DistribuicaoIdade> {
        let rows = or_default("age distribution", self.repo.por_faixa_etaria().await);
        let total = total_de(&rows);
        rows.into_iter()
            .map(|r| DistribuicaoIdade {
                descricao: faixa_descricao(r.codigo),
                faixa_etaria: r.codigo,
                total: r.total,
                percentual: percentual(r.total, total),
            })
            .collect()
    }
}
