//! Result handlers

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::pagination::page;
use crate::error::AppError;
use crate::models::{Resultado, ResultadoUpdate};
use crate::services::resultado::{
    DistribuicaoRedacaoResponse, EstatisticasPeriodo, MediasGeraisResponse,
    ParticipantesDestaqueResponse, RankingUfResponse, ResultadoFiltros, NOTA_CORTE_DEFAULT,
};
use crate::services::{OperationResponse, Paginated, ResultadoService};
use crate::state::AppState;
use crate::store::Record;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListResultadosParams {
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// Exam year
    pub ano: Option<i64>,
    /// INEP school code
    pub escola_codigo: Option<i64>,
    /// Exam state abbreviation
    pub uf_prova_sigla: Option<String>,
}

/// Highlight listing query
#[derive(Debug, Default, Deserialize)]
pub struct DestaqueParams {
    /// Cut-off score
    pub nota_corte: Option<f64>,
    /// Documents to skip
    pub skip: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
}

/// Creation interval, ISO-8601
#[derive(Debug, Default, Deserialize)]
pub struct PeriodoParams {
    /// Lower bound; a bare date starts at midnight UTC
    #[serde(default, deserialize_with = "inicio_iso")]
    pub data_inicio: Option<DateTime<Utc>>,
    /// Upper bound; a bare date ends at the last instant of the day
    #[serde(default, deserialize_with = "fim_iso")]
    pub data_fim: Option<DateTime<Utc>>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp, naive date-time or date; naive values are UTC
fn parse_iso(raw: &str, time_of_day: NaiveTime) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    // A `+hh:mm` offset arrives as a space when the query string was not encoded
    let candidates = [raw.to_string(), raw.replace(' ', "+")];
    for candidate in &candidates {
        if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(time_of_day).and_utc())
}

fn iso_bound<'de, D>(deserializer: D, time_of_day: NaiveTime) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_iso(&raw, time_of_day).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid ISO-8601 date or datetime: {}", raw))
        }),
    }
}

fn inicio_iso<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    iso_bound(deserializer, NaiveTime::MIN)
}

fn fim_iso<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    iso_bound(deserializer, end_of_day)
}

/// POST /resultados - Create a result, computing its derived fields
pub async fn create_resultado(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Resultado>,
) -> Result<(StatusCode, Json<Record<Resultado>>), AppError> {
    let record = ResultadoService::new(&state.db).criar(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /resultados - List results
pub async fn list_resultados(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListResultadosParams>,
) -> Result<Json<Paginated<Record<Resultado>>>, AppError> {
    let page = page(params.skip, params.limit)?;
    let filtros = ResultadoFiltros {
        ano: params.ano,
        escola_codigo: params.escola_codigo,
        uf_prova_sigla: params.uf_prova_sigla,
    };
    let result = ResultadoService::new(&state.db).listar(&filtros, page).await?;
    Ok(Json(result))
}

/// GET /resultados/:id - Get a result by id
pub async fn get_resultado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Record<Resultado>>, AppError> {
    let record = ResultadoService::new(&state.db).crud().get(&id.to_string()).await?;
    Ok(Json(record))
}

/// GET /resultados/participante/:inscricao - Get the result of a participant
pub async fn get_resultado_by_participante(
    State(state): State<AppState>,
    ApiPath(inscricao): ApiPath<String>,
) -> Result<Json<Record<Resultado>>, AppError> {
    let record = ResultadoService::new(&state.db)
        .get_by_participante(&inscricao)
        .await?;
    Ok(Json(record))
}

/// GET /resultados/sequencial/:nu_sequencial - Get a result by sequential number
pub async fn get_resultado_by_sequencial(
    State(state): State<AppState>,
    ApiPath(nu_sequencial): ApiPath<String>,
) -> Result<Json<Record<Resultado>>, AppError> {
    let record = ResultadoService::new(&state.db)
        .get_by_sequencial(&nu_sequencial)
        .await?;
    Ok(Json(record))
}

/// PUT /resultados/:id - Partially update a result
pub async fn update_resultado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ResultadoUpdate>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = ResultadoService::new(&state.db)
        .crud()
        .update(&id.to_string(), &body)
        .await?;
    Ok(Json(response))
}

/// DELETE /resultados/:id - Delete a result
pub async fn delete_resultado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OperationResponse>, AppError> {
    let response = ResultadoService::new(&state.db).crud().delete(&id.to_string()).await?;
    Ok(Json(response))
}

/// GET /resultados/estatisticas/medias-gerais - Mean score per area
pub async fn medias_gerais(State(state): State<AppState>) -> Json<MediasGeraisResponse> {
    Json(ResultadoService::new(&state.db).medias_gerais().await)
}

/// GET /resultados/estatisticas/ranking-uf - Exam states ranked by mean scores
pub async fn ranking_uf(State(state): State<AppState>) -> Json<RankingUfResponse> {
    Json(ResultadoService::new(&state.db).ranking_uf().await)
}

/// GET /resultados/estatisticas/participantes-destaque - Results with any score above a cutoff
pub async fn participantes_destaque(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DestaqueParams>,
) -> Result<Json<ParticipantesDestaqueResponse>, AppError> {
    let nota_corte = params.nota_corte.unwrap_or(NOTA_CORTE_DEFAULT);
    if !(0.0..=1000.0).contains(&nota_corte) {
        return Err(AppError::Validation(format!(
            "nota_corte must be between 0 and 1000 (got {})",
            nota_corte
        )));
    }
    let page = page(params.skip, params.limit)?;
    let service = ResultadoService::new(&state.db);
    Ok(Json(service.participantes_destaque(nota_corte, page).await))
}

/// GET /resultados/estatisticas/distribuicao-redacao - Essay score brackets
pub async fn distribuicao_redacao(State(state): State<AppState>) -> Json<DistribuicaoRedacaoResponse> {
    Json(ResultadoService::new(&state.db).distribuicao_redacao().await)
}

/// GET /resultados/estatisticas/periodo - Means of results created in an interval
pub async fn por_periodo(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PeriodoParams>,
) -> Result<Json<EstatisticasPeriodo>, AppError> {
    if let (Some(inicio), Some(fim)) = (params.data_inicio, params.data_fim) {
        if inicio > fim {
            return Err(AppError::Validation(
                "data_inicio must not be after data_fim".to_string(),
            ));
        }
    }
    let service = ResultadoService::new(&state.db);
    Ok(Json(
        service.por_periodo(params.data_inicio, params.data_fim).await,
    ))
}
