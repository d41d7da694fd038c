//! API module
//!
//! HTTP handlers for the ENEM collections, their statistics and the batch
//! load, plus the router that wires them together.

pub mod admin;
pub mod areas;
pub mod escolas;
pub mod extract;
pub mod municipios;
pub mod pagination;
pub mod participantes;
pub mod request_id;
pub mod resultados;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

/// Service banner
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    /// Greeting
    pub message: String,
    /// Always "ok"
    pub status: String,
}

/// Liveness check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Human-readable status
    pub message: String,
}

/// GET / - Service banner
pub async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "ENEM API - dados abertos do Exame Nacional do Ensino Médio".to_string(),
        status: "ok".to_string(),
    })
}

/// GET /health - Liveness check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "API is healthy".to_string(),
    })
}

/// Every route of the API, bound to `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/health", get(health_check))
        .route("/admin/load-data", post(admin::load_data))
        // Municipalities
        .route(
            "/municipios",
            get(municipios::list_municipios).post(municipios::create_municipio),
        )
        .route(
            "/municipios/estatisticas/regiao",
            get(municipios::estatisticas_regiao),
        )
        .route(
            "/municipios/codigo/:codigo",
            get(municipios::get_municipio_by_codigo),
        )
        .route(
            "/municipios/:id",
            get(municipios::get_municipio)
                .put(municipios::update_municipio)
                .delete(municipios::delete_municipio),
        )
        // Schools
        .route(
            "/escolas",
            get(escolas::list_escolas).post(escolas::create_escola),
        )
        .route("/escolas/busca", get(escolas::buscar_escolas))
        .route(
            "/escolas/estatisticas/por-dependencia",
            get(escolas::por_dependencia),
        )
        .route("/escolas/estatisticas/por-uf", get(escolas::por_uf))
        .route(
            "/escolas/estatisticas/por-localizacao",
            get(escolas::por_localizacao),
        )
        .route(
            "/escolas/estatisticas/top-participantes",
            get(escolas::top_participantes),
        )
        .route(
            "/escolas/estatisticas/ranking-desempenho",
            get(escolas::ranking_desempenho),
        )
        .route("/escolas/codigo/:codigo", get(escolas::get_escola_by_codigo))
        .route(
            "/escolas/codigo/:codigo/estatisticas",
            get(escolas::estatisticas_escola),
        )
        .route(
            "/escolas/:id",
            get(escolas::get_escola)
                .put(escolas::update_escola)
                .delete(escolas::delete_escola),
        )
        // Participants
        .route(
            "/participantes",
            get(participantes::list_participantes).post(participantes::create_participante),
        )
        .route(
            "/participantes/estatisticas/demograficas",
            get(participantes::demograficas),
        )
        .route(
            "/participantes/estatisticas/por-uf",
            get(participantes::por_uf),
        )
        .route(
            "/participantes/estatisticas/distribuicao-idade",
            get(participantes::distribuicao_idade),
        )
        .route(
            "/participantes/inscricao/:nu_inscricao",
            get(participantes::get_participante_by_inscricao),
        )
        .route(
            "/participantes/:id",
            get(participantes::get_participante)
                .put(participantes::update_participante)
                .delete(participantes::delete_participante),
        )
        // Results
        .route(
            "/resultados",
            get(resultados::list_resultados).post(resultados::create_resultado),
        )
        .route(
            "/resultados/estatisticas/medias-gerais",
            get(resultados::medias_gerais),
        )
        .route(
            "/resultados/estatisticas/ranking-uf",
            get(resultados::ranking_uf),
        )
        .route(
            "/resultados/estatisticas/participantes-destaque",
            get(resultados::participantes_destaque),
        )
        .route(
            "/resultados/estatisticas/distribuicao-redacao",
            get(resultados::distribuicao_redacao),
        )
        .route(
            "/resultados/estatisticas/periodo",
            get(resultados::por_periodo),
        )
        .route(
            "/resultados/participante/:inscricao",
            get(resultados::get_resultado_by_participante),
        )
        .route(
            "/resultados/sequencial/:nu_sequencial",
            get(resultados::get_resultado_by_sequencial),
        )
        .route(
            "/resultados/:id",
            get(resultados::get_resultado)
                .put(resultados::update_resultado)
                .delete(resultados::delete_resultado),
        )
        // Knowledge areas; `/areas/:area` is a store id, its subroutes take an area code
        .route("/areas", get(areas::list_areas).post(areas::create_area))
        .route("/areas/estatisticas/gerais", get(areas::estatisticas_gerais))
        .route("/areas/estatisticas/comparativo", get(areas::comparativo))
        .route("/areas/codigo/:codigo", get(areas::get_area_by_codigo))
        .route(
            "/areas/participante/:inscricao",
            get(areas::areas_participante),
        )
        .route(
            "/areas/:area",
            get(areas::get_area)
                .put(areas::update_area)
                .delete(areas::delete_area),
        )
        .route("/areas/:area/participantes", get(areas::participantes_area))
        .route("/areas/:area/ranking", get(areas::ranking_area))
        .route("/areas/:area/destaque", get(areas::destaque_area))
        .route(
            "/areas/:area/distribuicao-notas",
            get(areas::distribuicao_notas),
        )
        .with_state(state)
}
