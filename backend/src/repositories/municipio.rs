use crate::models::Municipio;
use crate::store::{Collection, Database, Filter, StoreError};
use sqlx::FromRow;

/// Aggregates of one region
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RegiaoRow {
    /// Region name, `None` for municipalities without one
    pub regiao: Option<String>,
    /// Municipalities in the region
    pub total_municipios: i64,
    /// Sum of known populations
    pub populacao_total: Option<i64>,
    /// Mean of known populations
    pub populacao_media: Option<f64>,
    /// Mean GDP per capita
    pub pib_per_capita_medio: Option<f64>,
    /// Mean HDI
    pub idh_medio: Option<f64>,
}

/// Most or least populous municipality of a region
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PopulacaoExtremoRow {
    /// Region name
    pub regiao: Option<String>,
    /// Municipality name
    pub nome: String,
}

/// Count per state
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UfCountRow {
    /// State abbreviation
    pub uf: Option<String>,
    /// Documents in the state
    pub total: i64,
}

/// Municipality collection and its aggregations
#[derive(Clone)]
pub struct MunicipioRepository {
    docs: Collection<Municipio>,
}

impl MunicipioRepository {
    /// Repository over the `municipios` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<Municipio> {
        &self.docs
    }

    /// Filter matching the natural key
    pub fn by_codigo(codigo: i64) -> Filter {
        Filter::new().eq("codigo", codigo)
    }

    /// Count, population, GDP and HDI per region, largest regions first
    pub async fn estatisticas_por_regiao(&self) -> Result<Vec<RegiaoRow>, StoreError> {
        let rows = sqlx::query_as::<_, RegiaoRow>(
            "SELECT doc ->> '$.regiao' AS regiao, \
                    COUNT(*) AS total_municipios, \
                    SUM(doc ->> '$.populacao') AS populacao_total, \
                    AVG(doc ->> '$.populacao') AS populacao_media, \
                    AVG(doc ->> '$.pib_per_capita') AS pib_per_capita_medio, \
                    AVG(doc ->> '$.idh') AS idh_medio \
             FROM municipios \
             GROUP BY doc ->> '$.regiao' \
             ORDER BY total_municipios DESC, regiao ASC",
        )
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Most (`largest = true`) or least populous municipality per region
    pub async fn extremos_populacao(&self, largest: bool) -> Result<Vec<PopulacaoExtremoRow>, StoreError> {
        // SQLite takes bare columns from the row holding the MAX/MIN
        let aggregate = if largest { "MAX" } else { "MIN" };
        let rows = sqlx::query_as::<_, PopulacaoExtremoRow>(&format!(
            "SELECT doc ->> '$.regiao' AS regiao, doc ->> '$.nome' AS nome, \
                    {}(CAST(doc ->> '$.populacao' AS INTEGER)) AS populacao \
             FROM municipios \
             WHERE doc ->> '$.populacao' IS NOT NULL \
             GROUP BY doc ->> '$.regiao'",
            aggregate
        ))
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Municipalities per state
    pub async fn contagem_por_uf(&self) -> Result<Vec<UfCountRow>, StoreError> {
        let rows = sqlx::query_as::<_, UfCountRow>(
            "SELECT doc ->> '$.uf_sigla' AS uf, COUNT(*) AS total \
             FROM municipios GROUP BY doc ->> '$.uf_sigla' ORDER BY uf",
        )
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }
}
