//! Municipality handlers

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::pagination::page;
use crate::error::AppError;
use crate::models::{Municipio, MunicipioUpdate};
use crate::services::municipio::{EstatisticasRegiaoResponse, MunicipioFiltros};
use crate::services::{MunicipioService, OperationResponse, Paginated};
use crate::state::AppState;
use crate::store::Record;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use uuid::Uuid;

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListMunicipiosParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// State abbreviation
    pub uf_sigla: Option<String>,
    /// Geographic region
    pub regiao: Option<String>,
}

/// POST /municipios - Create a municipality
pub async fn create_municipio(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Municipio>,
) -> Result<(StatusCode, Json<Record<Municipio>>), AppError> {
    let record = MunicipioService::new(&state.db).crud().create(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /municipios - List municipalities
pub async fn list_municipios(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListMunicipiosParams>,
) -> Result<Json<Paginated<Record<Municipio>>>, AppError> {
    let page = page(params.skip, params.limit)?;
    let filtros = MunicipioFiltros {
        uf_sigla: params.uf_sigla,
        regiao: params.regiao,
    };
    let result = MunicipioService::new(&state.db).listar(&filtros, page).await?;
    Ok(Json(result))
}

/// GET /municipios/:id - Get a municipality by id
pub async fn get_municipio(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record<Municipio>>, AppError> {
    let record = MunicipioService::new(&state.db).crud().get(&id.to_string()).await?;
    Ok(Json(record))
}

/// GET /municipios/codigo/:codigo - Get a municipality by IBGE code
pub async fn get_municipio_by_codigo(
    State(state): State<AppState>,
    ApiPath(codigo): ApiPath<i64>,
) -> Result<Json<Record<Municipio>>, AppError> {
    let record = MunicipioService::new(&state.db).get_by_codigo(codigo).await?;
    Ok(Json(record))
}

/// PUT /municipios/:id - Partially update a municipality
pub async fn update_municipio(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<MunicipioUpdate>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = MunicipioService::new(&state.db).crud().update(&id.to_string(), &body).await?;
    Ok(Json(response))
}

/// DELETE /municipios/:id - Delete a municipality
pub async fn delete_municipio(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = MunicipioService::new(&state.db).crud().delete(&id.to_string()).await?;
    Ok(Json(response))
}

/// GET /municipios/estatisticas/regiao - Statistics per region
pub async fn estatisticas_regiao(State(state): State<AppState>) -> Json<EstatisticasRegiaoResponse> {
    Json(MunicipioService::new(&state.db).estatisticas_por_regiao().await)
}
