//! School handlers

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::pagination::{limit_within, page};
use crate::error::AppError;
use crate::models::{Escola, EscolaUpdate};
use crate::services::escola::{
    EscolaFiltros, EstatisticaDependencia, EstatisticaLocalizacao, EstatisticaUfEscolas,
    EstatisticasEscolaResponse, RankingEscola, BUSCA_LIMIT_DEFAULT, RANKING_LIMIT_DEFAULT,
    TOP_LIMIT_DEFAULT,
};
use crate::services::{EscolaService, OperationResponse, Paginated};
use crate::state::AppState;
use crate::store::Record;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use uuid::Uuid;

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListEscolasParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// State abbreviation
    pub uf: Option<String>,
    /// IBGE municipality code
    pub municipio_codigo: Option<i64>,
    /// Administrative dependency code
    pub dependencia_administrativa: Option<i64>,
    /// Location type code
    pub localizacao: Option<i64>,
    /// Operating status code
    pub situacao_funcionamento: Option<i64>,
}

/// Name search query
#[derive(Debug, Default, Deserialize)]
pub struct BuscaParams {
    /// Case-insensitive name fragment
    pub nome: String,
    /// Maximum matches
    pub limit: Option<u64>,
}

/// Optional state filter
#[derive(Debug, Default, Deserialize)]
pub struct UfParams {
    /// Restrict to one state
    pub uf: Option<String>,
}

/// Optional result size
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    /// Maximum entries
    pub limit: Option<u64>,
}

/// POST /escolas - Create a school
pub async fn create_escola(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Escola>,
) -> Result<(StatusCode, Json<Record<Escola>>), AppError> {
    let record = EscolaService::new(&state.db).crud().create(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /escolas - List schools
pub async fn list_escolas(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListEscolasParams>,
) -> Result<Json<Paginated<Record<Escola>>>, AppError> {
    let page = page(params.skip, params.limit)?;
    let filtros = EscolaFiltros {
        uf: params.uf,
        municipio_codigo: params.municipio_codigo,
        dependencia_administrativa: params.dependencia_administrativa,
        localizacao: params.localizacao,
        situacao_funcionamento: params.situacao_funcionamento,
    };
    let result = EscolaService::new(&state.db).listar(&filtros, page).await?;
    Ok(Json(result))
}

/// GET /escolas/:id - Get a school by id
pub async fn get_escola(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record<Escola>>, AppError> {
    let record = EscolaService::new(&state.db).crud().get(&id.to_string()).await?;
    Ok(Json(record))
}

/// GET /escolas/codigo/:codigo - Get a school by INEP code
pub async fn get_escola_by_codigo(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<i64>,
) -> Result<Json<Record<Escola>>, AppError> {
    let record = EscolaService::new(&state.db).get_by_codigo(codigo).await?;
    Ok(Json(record))
}

/// GET /escolas/codigo/:codigo/estatisticas - Result statistics of one school
pub async fn estatisticas_escola(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<i64>,
) -> Result<Json<EstatisticasEscolaResponse>, AppError> {
    let response = EscolaService::new(&state.db).estatisticas_escola(codigo).await?;
    Ok(Json(response))
}

/// GET /escolas/busca?nome= - Case-insensitive name search
pub async fn buscar_escolas(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BuscaParams>,
) -> Result<Json<Vec<Record<Escola>>>, AppError> {
    let nome = params.nome.trim();
    if nome.is_empty() {
        return Err(AppError::Validation("nome cannot be empty".to_string()));
    }
    let limit = limit_within(params.limit.unwrap_or(BUSCA_LIMIT_DEFAULT), 100)?;
    let escolas = EscolaService::new(&state.db).buscar_por_nome(nome, limit).await?;
    Ok(Json(escolas))
}

/// PUT /escolas/:id - Partially update a school
pub async fn update_escola(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<EscolaUpdate>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = EscolaService::new(&state.db).crud().update(&id.to_string(), &body).await?;
    Ok(Json(response))
}

/// DELETE /escolas/:id - Delete a school
pub async fn delete_escola(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = EscolaService::new(&state.db).crud().delete(&id.to_string()).await?;
    Ok(Json(response))
}

/// GET /escolas/estatisticas/por-dependencia - Schools per administrative dependency
pub async fn por_dependencia(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UfParams>,
) -> Json<Vec<EstatisticaDependencia>> {
    let service = EscolaService::new(&state.db);
    Json(service.por_dependencia(params.uf.as_deref()).await)
}

/// GET /escolas/estatisticas/por-uf - Schools per state
pub async fn por_uf(State(state): State<AppState>) -> Json<Vec<EstatisticaUfEscolas>> {
    Json(EscolaService::new(&state.db).por_uf().await)
}

/// GET /escolas/estatisticas/por-localizacao - Urban and rural schools
pub async fn por_localizacao(State(state): State<AppState>) -> Json<Vec<EstatisticaLocalizacao>> {
    Json(EscolaService::new(&state.db).por_localizacao().await)
}

/// GET /escolas/estatisticas/top-participantes - Schools with most participants
pub async fn top_participantes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> Result<Json<Vec<Record<Escola>>>, AppError> {
    let limit = limit_within(params.limit.unwrap_or(TOP_LIMIT_DEFAULT), 100)?;
    Ok(Json(EscolaService::new(&state.db).top_participantes(limit).await))
}

/// GET /escolas/estatisticas/ranking-desempenho - Schools ranked by mean score
pub async fn ranking_desempenho(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> Result<Json<Vec<RankingEscola>>, AppError> {
    let limit = limit_within(params.limit.unwrap_or(RANKING_LIMIT_DEFAULT as u64), 100)?;
    Ok(Json(EscolaService::new(&state.db).ranking_desempenho(limit as usize).await))
}
