//! Integration tests for the HTTP handlers
//!
//! Handlers are called directly with their extractors over an in-memory
//! store, covering the CRUD flow, error statuses and the batch load.

use axum::extract::State;
use axum::http::StatusCode;
use enem_api_backend::api::extract::{ApiJson, ApiPath, ApiQuery};
use enem_api_backend::api::{admin, areas, escolas, municipios, resultados};
use enem_api_backend::config::{
    Config, CsvEncoding, DatabaseConfig, LoaderConfig, ServerConfig,
};
use enem_api_backend::models::{Municipio, MunicipioUpdate};
use enem_api_backend::state::AppState;
use enem_api_backend::store::Database;
use std::path::Path;
use uuid::Uuid;

const PARTICIPANTES: &str = "\
NU_INSCRICAO;NU_ANO;TP_FAIXA_ETARIA;TP_SEXO;TP_ESTADO_CIVIL;TP_COR_RACA;TP_NACIONALIDADE;TP_ST_CONCLUSAO;IN_TREINEIRO;CO_MUNICIPIO_PROVA;NO_MUNICIPIO_PROVA;CO_UF_PROVA;SG_UF_PROVA
210001;2023;3;F;1;3;1;2;0;2611606;Recife;26;PE
210002;2023;4;M;1;1;1;1;1;2611606;Recife;26;PE
";

const RESULTADOS: &str = "\
NU_SEQUENCIAL;NU_INSCRICAO;NU_ANO;CO_ESCOLA;CO_MUNICIPIO_ESC;NO_MUNICIPIO_ESC;CO_UF_ESC;SG_UF_ESC;TP_DEPENDENCIA_ADM_ESC;TP_LOCALIZACAO_ESC;TP_SIT_FUNC_ESC;NU_NOTA_CN;NU_NOTA_REDACAO
1;210001;2023;26000001;2611606;Recife;26;PE;2;1;1;520.5;760
2;210002;2023;26000001;2611606;Recife;26;PE;2;1;1;610;880
";

fn test_config(data_dir: &Path, enabled: bool) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        loader: LoaderConfig {
            data_dir: data_dir.to_path_buf(),
            participantes_file: "participantes.csv".to_string(),
            resultados_file: "resultados.csv".to_string(),
            delimiter: b';',
            encoding: CsvEncoding::Utf8,
            enabled,
            load_on_startup: false,
        },
    }
}

/// Helper to create test AppState over an empty in-memory store
async fn create_test_state(data_dir: &Path, enabled: bool) -> AppState {
    let db = Database::in_memory().await.unwrap();
    AppState::new(db, test_config(data_dir, enabled))
}

fn recife() -> Municipio {
    Municipio {
        codigo: 2611606,
        nome: "Recife".to_string(),
        uf_codigo: 26,
        uf_sigla: "PE".to_string(),
        regiao: Some("Nordeste".to_string()),
        populacao: Some(1_488_920),
        pib_per_capita: None,
        idh: Some(0.772),
    }
}

#[tokio::test]
async fn test_municipio_crud_flow() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), false).await;

    let (status, created) =
        municipios::create_municipio(State(state.clone()), ApiJson(recife()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let id: Uuid = created.0.id.parse().unwrap();

    let fetched = municipios::get_municipio(State(state.clone()), ApiPath(id))
        .await
        .unwrap();
    assert_eq!(fetched.0.doc.nome, "Recife");

    let by_codigo = municipios::get_municipio_by_codigo(State(state.clone()), ApiPath(2611606))
        .await
        .unwrap();
    assert_eq!(by_codigo.0.id, id.to_string());

    let update = MunicipioUpdate {
        populacao: Some(1_500_000),
        ..Default::default()
    };
    let updated = municipios::update_municipio(
        State(state.clone()),
        ApiPath(id),
        ApiJson(update),
    )
    .await
    .unwrap();
    assert!(updated.0.success);

    let fetched = municipios::get_municipio(State(state.clone()), ApiPath(id))
        .await
        .unwrap();
    assert_eq!(fetched.0.doc.populacao, Some(1_500_000));
    assert_eq!(fetched.0.doc.nome, "Recife");

    municipios::delete_municipio(State(state.clone()), ApiPath(id))
        .await
        .unwrap();
    let err = municipios::get_municipio(State(state), ApiPath(id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_codigo_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), false).await;

    municipios::create_municipio(State(state.clone()), ApiJson(recife()))
        .await
        .unwrap();
    let err = municipios::create_municipio(State(state), ApiJson(recife()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_update_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), false).await;

    let (_, created) = municipios::create_municipio(State(state.clone()), ApiJson(recife()))
        .await
        .unwrap();
    let err = municipios::update_municipio(
        State(state),
        ApiPath(created.0.id.parse().unwrap()),
        ApiJson(MunicipioUpdate::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_pagination_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), false).await;

    for (i, nome) in ["Olinda", "Recife", "Caruaru"].iter().enumerate() {
        let municipio = Municipio {
            codigo: 2600001 + i as i64,
            nome: nome.to_string(),
            ..recife()
        };
        municipios::create_municipio(State(state.clone()), ApiJson(municipio))
            .await
            .unwrap();
    }

    let params = municipios::ListMunicipiosParams {
        skip: Some(0),
        limit: Some(2),
        ..Default::default()
    };
    let page = municipios::list_municipios(State(state.clone()), ApiQuery(params))
        .await
        .unwrap();
    assert_eq!(page.0.total, 3);
    assert_eq!(page.0.items.len(), 2);
    assert!(page.0.has_more);
    assert_eq!(page.0.total_pages, 2);
    assert_eq!(page.0.items[0].doc.nome, "Caruaru");

    let invalid = municipios::ListMunicipiosParams {
        limit: Some(5000),
        ..Default::default()
    };
    let err = municipios::list_municipios(State(state), ApiQuery(invalid))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_load_data_disabled_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), false).await;

    let err = admin::load_data(State(state)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_load_data_missing_files_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = create_test_state(dir.path(), true).await;

    let err = admin::load_data(State(state)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_load_data_then_query_statistics() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("participantes.csv"), PARTICIPANTES).unwrap();
    std::fs::write(dir.path().join("resultados.csv"), RESULTADOS).unwrap();
    let state = create_test_state(dir.path(), true).await;

    let response = admin::load_data(State(state.clone())).await.unwrap();
    assert_eq!(response.0.status, "success");
    assert_eq!(response.0.files_processed.len(), 2);
    assert_eq!(response.0.summary.resultados, 2);

    let escola = escolas::estatisticas_escola(State(state.clone()), ApiPath(26000001))
        .await
        .unwrap();
    assert_eq!(escola.0.escola.doc.total_participantes, 2);
    assert_eq!(escola.0.estatisticas.total_resultados, 2);
    assert_eq!(
        escola.0.estatisticas.medias.get("ciencias_natureza"),
        Some(&Some(565.25))
    );

    let medias = resultados::medias_gerais(State(state.clone())).await;
    assert_eq!(medias.0.total_resultados, 2);

    let por_area = areas::estatisticas_gerais(State(state.clone())).await;
    assert_eq!(por_area.0.total_areas, 5);

    let sequencial = resultados::get_resultado_by_sequencial(State(state), ApiPath("2".to_string()))
        .await
        .unwrap();
    assert_eq!(sequencial.0.doc.participante_inscricao, "210002");
}
