//! Knowledge area handlers

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::pagination::{page, page_within};
use crate::error::AppError;
use crate::models::{AreaConhecimento, AreaConhecimentoUpdate};
use crate::services::area::{
    AreasParticipanteResponse, ComparativoAreasResponse, DestaqueAreaResponse,
    DistribuicaoNotasResponse, EstatisticasAreasResponse, ParticipantesAreaResponse,
    RankingAreaResponse, NOTA_MINIMA_DEFAULT,
};
use crate::services::{AreaService, OperationResponse, Paginated};
use crate::state::AppState;
use crate::store::Record;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use uuid::Uuid;

/// Default page size of the highlight listing
pub const DESTAQUE_LIMIT_DEFAULT: i64 = 10;
/// Largest page size of the highlight listing
pub const DESTAQUE_LIMIT_MAX: i64 = 100;

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListAreasParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// Only active areas (default true)
    pub ativas_apenas: Option<bool>,
    /// Minimum default weight
    pub peso_minimo: Option<f64>,
}

/// Paginated rows of one area
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
}

/// Optional exam year
#[derive(Debug, Default, Deserialize)]
pub struct RankingParams {
    /// Restrict to one exam year
    pub ano: Option<i64>,
}

/// Highlight listing query
#[derive(Debug, Default, Deserialize)]
pub struct DestaqueAreaParams {
    /// Lowest score included
    pub nota_minima: Option<f64>,
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
}

fn area_codigo(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// POST /areas - Create a knowledge area
pub async fn create_area(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<AreaConhecimento>,
) -> Result<(StatusCode, Json<Record<AreaConhecimento>>), AppError> {
    body.codigo = area_codigo(&body.codigo);
    let record = AreaService::new(&state.db).crud().create(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /areas - List knowledge areas
pub async fn list_areas(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListAreasParams>,
) -> Result<Json<Paginated<Record<AreaConhecimento>>>, AppError> {
    let page = page(params.skip, params.limit)?;
    let result = AreaService::new(&state.db)
        .listar(params.ativas_apenas.unwrap_or(true), params.peso_minimo, page)
        .await?;
    Ok(Json(result))
}

/// GET /areas/:id - Get a knowledge area by id
pub async fn get_area(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record<AreaConhecimento>>, AppError> {
    let record = AreaService::new(&state.db).crud().get(&id.to_string()).await?;
    Ok(Json(record))
}

/// GET /areas/codigo/:codigo - Get a knowledge area by code
pub async fn get_area_by_codigo(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<String>,
) -> Result<Json<Record<AreaConhecimento>>, AppError> {
    let record = AreaService::new(&state.db)
        .get_by_codigo(&area_codigo(&codigo))
        .await?;
    Ok(Json(record))
}

/// PUT /areas/:id - Partially update a knowledge area
pub async fn update_area(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AreaConhecimentoUpdate>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = AreaService::new(&state.db).crud().update(&id.to_string(), &body).await?;
    Ok(Json(response))
}

/// DELETE /areas/:id - Delete a knowledge area
pub async fn delete_area(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = AreaService::new(&state.db).crud().delete(&id.to_string()).await?;
    Ok(Json(response))
}

/// GET /areas/estatisticas/gerais - Aggregates per area
pub async fn estatisticas_gerais(State(state): State<AppState>) -> Json<EstatisticasAreasResponse> {
    Json(AreaService::new(&state.db).estatisticas_gerais().await)
}

/// GET /areas/estatisticas/comparativo - Side-by-side comparison of the areas
pub async fn comparativo(State(state): State<AppState>) -> Json<ComparativoAreasResponse> {
    Json(AreaService::new(&state.db).comparativo().await)
}

/// GET /areas/:codigo/participantes - Participants of one area
pub async fn participantes_area(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<ParticipantesAreaResponse>, AppError> {
    let page = page(params.skip, params.limit)?;
    let response = AreaService::new(&state.db)
        .participantes_area(&area_codigo(&codigo), page)
        .await?;
    Ok(Json(response))
}

/// GET /areas/:codigo/ranking - Best scores of one area
pub async fn ranking_area(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<String>,
    ApiQuery(params): ApiQuery<RankingParams>,
) -> Json<RankingAreaResponse> {
    let service = AreaService::new(&state.db);
    Json(service.ranking_area(&area_codigo(&codigo), params.ano).await)
}

/// GET /areas/:codigo/destaque - Scores of one area above a threshold
pub async fn destaque_area(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<String>,
    ApiQuery(params): ApiQuery<DestaqueAreaParams>,
) -> Result<Json<DestaqueAreaResponse>, AppError> {
    let nota_minima = params.nota_minima.unwrap_or(NOTA_MINIMA_DEFAULT);
    if !(0.0..=1000.0).contains(&nota_minima) {
        return Err(AppError::Validation(format!(
            "nota_minima must be between 0 and 1000 (got {})",
            nota_minima
        )));
    }
    let page = page_within(
        params.skip,
        params.limit,
        DESTAQUE_LIMIT_DEFAULT,
        DESTAQUE_LIMIT_MAX,
    )?;
    let service = AreaService::new(&state.db);
    Ok(Json(
        service
            .destaque_area(&area_codigo(&codigo), nota_minima, page)
            .await,
    ))
}

/// GET /areas/:codigo/distribuicao-notas - Score brackets of one area
pub async fn distribuicao_notas(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<String>,
) -> Json<DistribuicaoNotasResponse> {
    let service = AreaService::new(&state.db);
    Json(service.distribuicao_notas(&area_codigo(&codigo)).await)
}

/// GET /areas/participante/:inscricao - Every area score of one participant
pub async fn areas_participante(
    State(state): State<AppState>,
    ApiPath(inscricao): ApiPath<String>,
) -> Result<Json<AreasParticipanteResponse>, AppError> {
    let response = AreaService::new(&state.db)
        .areas_participante(&inscricao)
        .await?;
    Ok(Json(response))
}
