//! CSV batch loader
//!
//! Reads the participants and results CSV snapshot, builds the documents of
//! every collection and replaces the stored collections in a single
//! transaction. Parsing runs on a blocking thread; a storage error rolls the
//! whole load back.

mod csv_source;
mod documents;

pub use csv_source::{CsvRow, CsvTable};
pub use documents::{areas_do_resultado, build_snapshot, Snapshot};

use crate::config::LoaderConfig;
use crate::store::{Collection, Database, Document, StoreError};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Errors raised while loading the CSV snapshot
#[derive(Error, Debug)]
pub enum LoadError {
    /// A CSV file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A CSV file is malformed
    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        /// File path
        path: String,
        /// Parser error
        source: csv::Error,
    },

    /// Writing the collections failed; nothing was applied
    #[error("Failed to store loaded data: {0}")]
    Store(#[from] StoreError),

    /// The parsing task panicked or was cancelled
    #[error("Load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Documents written per collection by a load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    /// Municipalities written
    pub municipios: usize,
    /// Schools written
    pub escolas: usize,
    /// Participants written
    pub participantes: usize,
    /// Results written
    pub resultados: usize,
    /// Knowledge areas written
    pub areas_conhecimento: usize,
    /// Participant/area rows written
    pub participantes_areas: usize,
    /// Rows skipped as invalid or duplicate
    pub linhas_ignoradas: usize,
    /// Wall-clock time of the load
    pub duracao_ms: u128,
}

/// Read both CSV files named by `config` and replace every collection
pub async fn load_from_csv(db: &Database, config: &LoaderConfig) -> Result<LoadSummary, LoadError> {
    let start = Instant::now();
    let participantes_path = config.participantes_path();
    let resultados_path = config.resultados_path();
    let delimiter = config.delimiter;
    let encoding = config.encoding;
    info!(
        "Loading CSV snapshot from {} and {}",
        participantes_path.display(),
        resultados_path.display()
    );

    let snapshot = tokio::task::spawn_blocking(move || -> Result<Snapshot, LoadError> {
        let participantes = CsvTable::read(&participantes_path, delimiter, encoding)?;
        let resultados = CsvTable::read(&resultados_path, delimiter, encoding)?;
        info!(
            "Read {} participant rows and {} result rows",
            participantes.len(),
            resultados.len()
        );
        Ok(build_snapshot(&participantes, &resultados))
    })
    .await??;

    let mut summary = store_snapshot(db, snapshot).await.map_err(|e| {
        error!("Batch load aborted, no collection was changed: {}", e);
        e
    })?;
    summary.duracao_ms = start.elapsed().as_millis();
    info!("Batch load finished: {:?}", summary);
    Ok(summary)
}

async fn replace_all<T: Document>(conn: &mut SqliteConnection, docs: Vec<T>) -> Result<usize, StoreError> {
    let removed = Collection::<T>::delete_all_with(conn).await?;
    let count = docs.len();
    for doc in docs {
        Collection::<T>::insert_with(conn, doc).await?;
    }
    info!(
        "Replaced {} {} documents with {}",
        removed,
        T::COLLECTION,
        count
    );
    Ok(count)
}

/// Replace every collection with the snapshot inside one transaction
pub async fn store_snapshot(db: &Database, snapshot: Snapshot) -> Result<LoadSummary, LoadError> {
    let mut tx = db.begin().await?;
    let summary = LoadSummary {
        municipios: replace_all(&mut *tx, snapshot.municipios).await?,
        escolas: replace_all(&mut *tx, snapshot.escolas).await?,
        participantes: replace_all(&mut *tx, snapshot.participantes).await?,
        resultados: replace_all(&mut *tx, snapshot.resultados).await?,
        areas_conhecimento: replace_all(&mut *tx, snapshot.areas).await?,
        participantes_areas: replace_all(&mut *tx, snapshot.participantes_areas).await?,
        linhas_ignoradas: snapshot.linhas_ignoradas,
        duracao_ms: 0,
    };
    tx.commit().await.map_err(StoreError::from)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsvEncoding;
    use crate::models::{Municipio, Participante};
    use crate::store::Filter;
    use std::path::Path;

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

    fn config(dir: &Path) -> LoaderConfig {
        LoaderConfig {
            data_dir: dir.to_path_buf(),
            participantes_file: "participantes.csv".to_string(),
            resultados_file: "resultados.csv".to_string(),
            delimiter: b';',
            encoding: CsvEncoding::Utf8,
            enabled: true,
            load_on_startup: false,
        }
    }

    fn write_fixture(dir: &Path) {
        std::fs::write(dir.join("participantes.csv"), PARTICIPANTES).unwrap();
        std::fs::write(dir.join("resultados.csv"), RESULTADOS).unwrap();
    }

    #[tokio::test]
    async fn test_load_populates_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let db = Database::in_memory().await.unwrap();

        let summary = load_from_csv(&db, &config(dir.path())).await.unwrap();
        assert_eq!(summary.participantes, 2);
        assert_eq!(summary.resultados, 2);
        assert_eq!(summary.municipios, 1);
        assert_eq!(summary.escolas, 1);
        assert_eq!(summary.areas_conhecimento, 5);
        assert_eq!(summary.participantes_areas, 10);
        assert_eq!(summary.linhas_ignoradas, 0);

        let municipios = db.collection::<Municipio>();
        let recife = municipios.find_one(&Filter::new()).await.unwrap().unwrap();
        assert_eq!(recife.doc.regiao.as_deref(), Some("Nordeste"));
    }

    #[tokio::test]
    async fn test_reload_replaces_previous_documents() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let db = Database::in_memory().await.unwrap();

        load_from_csv(&db, &config(dir.path())).await.unwrap();
        load_from_csv(&db, &config(dir.path())).await.unwrap();

        let total = db
            .collection::<Participante>()
            .count(&Filter::new())
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_missing_file_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let db = Database::in_memory().await.unwrap();
        load_from_csv(&db, &config(dir.path())).await.unwrap();

        std::fs::remove_file(dir.path().join("resultados.csv")).unwrap();
        let err = load_from_csv(&db, &config(dir.path())).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));

        let total = db
            .collection::<Participante>()
            .count(&Filter::new())
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_invalid_municipality_counts_as_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let participantes = format!("{}210003;2023;3;F;1;3;1;2;0;0;Sem Código;26;PE\n", PARTICIPANTES);
        std::fs::write(dir.path().join("participantes.csv"), participantes).unwrap();
        std::fs::write(dir.path().join("resultados.csv"), RESULTADOS).unwrap();
        let db = Database::in_memory().await.unwrap();

        let summary = load_from_csv(&db, &config(dir.path())).await.unwrap();
        assert_eq!(summary.participantes, 3);
        assert_eq!(summary.municipios, 1);
        assert_eq!(summary.linhas_ignoradas, 1);
    }

    #[tokio::test]
    async fn test_store_error_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        let participantes = CsvTable::parse(&PARTICIPANTES.replace(';', ","), b',').unwrap();
        let resultados = CsvTable::parse(&RESULTADOS.replace(';', ","), b',').unwrap();
        let mut snapshot = build_snapshot(&participantes, &resultados);
        // Same natural key twice violates the unique index
        let dup = snapshot.municipios[0].clone();
        snapshot.municipios.push(dup);

        let err = store_snapshot(&db, snapshot).await.unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::Duplicate { .. })));
        let total = db
            .collection::<Municipio>()
            .count(&Filter::new())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }
}
