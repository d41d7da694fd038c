//! Administrative handlers

use crate::error::AppError;
use crate::loader::{load_from_csv, LoadSummary};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a batch load
#[derive(Debug, Serialize)]
pub struct LoadDataResponse {
    /// Always "success"; failures are reported as errors
    pub status: String,
    /// Human-readable outcome
    pub message: String,
    /// CSV files that were read
    pub files_processed: Vec<String>,
    /// Documents written per collection
    pub summary: LoadSummary,
}

/// POST /admin/load-data - Replace every collection with the CSV snapshot
pub async fn load_data(State(state): State<AppState>) -> Result<Json<LoadDataResponse>, AppError> {
    let loader = &state.config.loader;
    if !loader.enabled {
        warn!("Rejected data load request: loading is disabled");
        return Err(AppError::PermissionDenied(
            "data loading is disabled (set ENABLE_DATA_LOAD=true)".to_string(),
        ));
    }

    let files = [loader.participantes_path(), loader.resultados_path()];
    if !loader.files_present() {
        warn!("CSV files not found in {}", loader.data_dir.display());
        return Err(AppError::FileNotFound(
            files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }

    info!("Starting batch load");
    let summary = load_from_csv(&state.db, loader).await?;
    Ok(Json(LoadDataResponse {
        status: "success".to_string(),
        message: "Dados carregados com sucesso!".to_string(),
        files_processed: files.iter().map(|f| f.display().to_string()).collect(),
        summary,
    }))
}
