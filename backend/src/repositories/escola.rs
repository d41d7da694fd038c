use super::{AreaMeansRow, AREA_MEANS_SQL};
use crate::models::Escola;
use crate::store::{Collection, Database, Filter, Page, Record, Sort, StoreError};
use sqlx::{FromRow, QueryBuilder, Sqlite};

/// School counts grouped by one field
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EscolaGroupRow {
    /// Integer group key (dependency, location)
    pub codigo: Option<i64>,
    /// Text group key (state)
    pub chave: Option<String>,
    /// Schools in the group
    pub total_escolas: i64,
    /// Sum of `total_participantes`
    pub total_participantes: i64,
    /// Mean of `total_participantes`
    pub media_participantes: Option<f64>,
}

/// A school joined with the aggregate of its results
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RankingEscolaRow {
    /// School code
    pub codigo: i64,
    /// School name
    pub nome: Option<String>,
    /// Municipality code
    pub municipio_codigo: Option<i64>,
    /// State abbreviation
    pub uf_sigla: Option<String>,
    /// Administrative dependency
    pub dependencia_administrativa: Option<i64>,
    /// Operating status
    pub situacao_funcionamento: Option<i64>,
    /// Result aggregates
    #[sqlx(flatten)]
    pub medias: AreaMeansRow,
}

/// School collection and its aggregations
#[derive(Clone)]
pub struct EscolaRepository {
    docs: Collection<Escola>,
}

/// Minimum number of results for a school to enter the ranking
pub const MIN_RESULTADOS_RANKING: i64 = 5;

impl EscolaRepository {
    /// Repository over the `escolas` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<Escola> {
        &self.docs
    }

    /// Filter matching the natural key
    pub fn by_codigo(codigo: i64) -> Filter {
        Filter::new().eq("codigo", codigo)
    }

    async fn agrupar(&self, int_key: Option<&str>, text_key: Option<&str>, filter: &Filter) -> Result<Vec<EscolaGroupRow>, StoreError> {
        let int_expr = int_key.map_or("NULL".to_string(), |k| format!("doc ->> '$.{}'", k));
        let text_expr = text_key.map_or("NULL".to_string(), |k| format!("doc ->> '$.{}'", k));

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {int} AS codigo, {text} AS chave, COUNT(*) AS total_escolas, \
                    COALESCE(SUM(doc ->> '$.total_participantes'), 0) AS total_participantes, \
                    AVG(doc ->> '$.total_participantes') AS media_participantes \
             FROM escolas",
            int = int_expr,
            text = text_expr
        ));
        filter.push_where(&mut qb);
        qb.push(" GROUP BY codigo, chave ORDER BY total_escolas DESC, codigo, chave");

        let rows = qb.build_query_as::<EscolaGroupRow>().fetch_all(self.docs.pool()).await?;
        Ok(rows)
    }

    /// Schools per administrative dependency, optionally within one state
    pub async fn por_dependencia(&self, uf: Option<&str>) -> Result<Vec<EscolaGroupRow>, StoreError> {
        let filter = Filter::new().eq_opt("uf_sigla", uf);
        self.agrupar(Some("dependencia_administrativa"), None, &filter).await
    }

    /// Schools per state
    pub async fn por_uf(&self) -> Result<Vec<EscolaGroupRow>, StoreError> {
        self.agrupar(None, Some("uf_sigla"), &Filter::new()).await
    }

    /// Schools per location type
    pub async fn por_localizacao(&self) -> Result<Vec<EscolaGroupRow>, StoreError> {
        self.agrupar(Some("localizacao"), None, &Filter::new()).await
    }

    /// Schools with the most participants
    pub async fn top_participantes(&self, limit: u64) -> Result<Vec<Record<Escola>>, StoreError> {
        self.docs
            .find(
                &Filter::new().gt("total_participantes", 0_i64),
                Sort::desc("total_participantes"),
                Some(Page::new(0, limit)),
            )
            .await
    }

    /// Schools joined with their results, keeping those with at least
    /// `MIN_RESULTADOS_RANKING` results
    pub async fn ranking_base(&self) -> Result<Vec<RankingEscolaRow>, StoreError> {
        let rows = sqlx::query_as::<_, RankingEscolaRow>(&format!(
            "SELECT e.doc ->> '$.codigo' AS codigo, \
                    e.doc ->> '$.nome' AS nome, \
                    e.doc ->> '$.municipio_codigo' AS municipio_codigo, \
                    e.doc ->> '$.uf_sigla' AS uf_sigla, \
                    e.doc ->> '$.dependencia_administrativa' AS dependencia_administrativa, \
                    e.doc ->> '$.situacao_funcionamento' AS situacao_funcionamento, \
                    r.total, r.media_cn, r.media_ch, r.media_lc, r.media_mt, r.media_redacao \
             FROM escolas e \
             JOIN (SELECT doc ->> '$.escola_codigo' AS escola_codigo, {} \
                   FROM resultados \
                   WHERE doc ->> '$.escola_codigo' IS NOT NULL \
                   GROUP BY doc ->> '$.escola_codigo') r \
               ON r.escola_codigo = e.doc ->> '$.codigo' \
             WHERE r.total >= ?",
            AREA_MEANS_SQL
        ))
        .bind(MIN_RESULTADOS_RANKING)
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Result count and per-area means of one school
    pub async fn medias_escola(&self, codigo: i64) -> Result<AreaMeansRow, StoreError> {
        let row = sqlx::query_as::<_, AreaMeansRow>(&format!(
            "SELECT {} FROM resultados WHERE doc ->> '$.escola_codigo' = ?",
            AREA_MEANS_SQL
        ))
        .bind(codigo)
        .fetch_one(self.docs.pool())
        .await?;
        Ok(row)
    }
}
