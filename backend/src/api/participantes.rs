//! Participant handlers

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::pagination::page;
use crate::error::AppError;
use crate::models::{Participante, ParticipanteUpdate};
use crate::services::participante::{
    DistribuicaoIdade, EstatisticaUfParticipantes, EstatisticasDemograficas, ParticipanteFiltros,
};
use crate::services::{OperationResponse, Paginated, ParticipanteService};
use crate::state::AppState;
use crate::store::Record;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use uuid::Uuid;

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListParticipantesParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// Exam year
    pub ano: Option<i64>,
    /// Sex (M or F)
    pub sexo: Option<String>,
    /// Exam state abbreviation
    pub uf_prova: Option<String>,
    /// Exam municipality code
    pub municipio_prova_codigo: Option<i64>,
    /// Trainee flag
    pub treineiro: Option<bool>,
    /// Lowest age bracket
    pub faixa_etaria_min: Option<i64>,
    /// Highest age bracket
    pub faixa_etaria_max: Option<i64>,
}

/// Optional exam state filter
#[derive(Debug, Default, Deserialize)]
pub struct UfSiglaParams {
    /// Restrict to one state
    pub uf_sigla: Option<String>,
}

/// POST /participantes - Create a participant
pub async fn create_participante(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Participante>,
) -> Result<(StatusCode, Json<Record<Participante>>), AppError> {
    let record = ParticipanteService::new(&state.db).crud().create(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /participantes - List participants
pub async fn list_participantes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParticipantesParams>,
) -> Result<Json<Paginated<Record<Participante>>>, AppError> {
    let page = page(params.skip, params.limit)?;
    if let (Some(min), Some(max)) = (params.faixa_etaria_min, params.faixa_etaria_max) {
        if min > max {
            return Err(AppError::Validation(format!(
                "faixa_etaria_min ({}) is greater than faixa_etaria_max ({})",
                min, max
            )));
        }
    }
    let filtros = ParticipanteFiltros {
        ano: params.ano,
        sexo: params.sexo,
        uf_prova: params.uf_prova,
        municipio_prova_codigo: params.municipio_prova_codigo,
        treineiro: params.treineiro,
        faixa_etaria_min: params.faixa_etaria_min,
        faixa_etaria_max: params.faixa_etaria_max,
    };
    let result = ParticipanteService::new(&state.db).listar(&filtros, page).await?;
    Ok(Json(result))
}

/// GET /participantes/:id - Get a participant by id
pub async fn get_participante(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record<Participante>>, AppError> {
    let record = ParticipanteService::new(&state.db).crud().get(&id.to_string()).await?;
    Ok(Json(record))
}

/// GET /participantes/inscricao/:nu_inscricao - Get a participant by enrollment number
pub async fn get_participante_by_inscricao(
    State(state): State<AppState>,
    ApiPath(nu_inscricao): ApiPath<String>,
) -> Result<Json<Record<Participante>>, AppError> {
    let record = ParticipanteService::new(&state.db)
        .get_by_inscricao(&nu_inscricao)
        .await?;
    Ok(Json(record))
}

/// PUT /participantes/:id - Partially update a participant
pub async fn update_participante(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ParticipanteUpdate>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = ParticipanteService::new(&state.db)
        .crud()
        .update(&id.to_string(), &body)
        .await?;
    Ok(Json(response))
}

/// DELETE /participantes/:id - Delete a participant
pub async fn delete_participante(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = ParticipanteService::new(&state.db).crud().delete(&id.to_string()).await?;
    Ok(Json(response))
}

/// GET /participantes/estatisticas/demograficas - Sex, age and race breakdowns
pub async fn demograficas(State(state): State<AppState>) -> Json<EstatisticasDemograficas> {
    Json(ParticipanteService::new(&state.db).demograficas().await)
}

/// GET /participantes/estatisticas/por-uf - Participants per exam state
pub async fn por_uf(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UfSiglaParams>,
) -> Json<Vec<EstatisticaUfParticipantes>> {
    let service = ParticipanteService::new(&state.db);
    Json(service.por_uf(params.uf_sigla.as_deref()).await)
}

/// GET /participantes/estatisticas/distribuicao-idade - Participants per age bracket
pub async fn distribuicao_idade(State(state): State<AppState>) -> Json<Vec<DistribuicaoIdade>> {
    Json(ParticipanteService::new(&state.db).distribuicao_idade().await)
}
