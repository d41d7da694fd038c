use super::{AreaMeansRow, AREA_MEANS_SQL};
use crate::models::Resultado;
use crate::stats::{bracket_case_sql, REDACAO_BRACKETS};
use crate::store::{Collection, Database, Filter, StoreError};
use sqlx::{FromRow, QueryBuilder, Sqlite};

/// Score fields of a result in catalog order (CN, CH, LC, MT, RE)
pub const NOTA_FIELDS: &[&str] = &["nota_cn", "nota_ch", "nota_lc", "nota_mt", "nota_redacao"];

/// Mean and participant count per area over every result
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct AreaCountsRow {
    /// Result count and mean score per area
    #[sqlx(flatten)]
    pub medias: AreaMeansRow,
    /// Results with a CN score
    pub count_cn: i64,
    /// Results with a CH score
    pub count_ch: i64,
    /// Results with an LC score
    pub count_lc: i64,
    /// Results with an MT score
    pub count_mt: i64,
    /// Results with an essay score
    pub count_redacao: i64,
}

impl AreaCountsRow {
    /// Scored results per area in catalog order
    pub fn counts(&self) -> [i64; 5] {
        [
            self.count_cn,
            self.count_ch,
            self.count_lc,
            self.count_mt,
            self.count_redacao,
        ]
    }
}

/// Per-state means of the exam location
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RankingUfRow {
    /// Exam state abbreviation
    pub uf: String,
    /// Count and means of the state
    #[sqlx(flatten)]
    pub medias: AreaMeansRow,
}

/// One essay score bracket
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RedacaoBracketRow {
    /// Index into `REDACAO_BRACKETS`, `-1` for missing or invalid scores
    pub faixa: i64,
    /// Results in the bracket
    pub total: i64,
    /// Mean essay score
    pub media: Option<f64>,
    /// Sum of the essay scores
    pub soma: Option<f64>,
    /// Lowest essay score
    pub minima: Option<f64>,
    /// Highest essay score
    pub maxima: Option<f64>,
}

/// Result collection and its aggregations
#[derive(Clone)]
pub struct ResultadoRepository {
    docs: Collection<Resultado>,
}

impl ResultadoRepository {
    /// Repository over the `resultados` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<Resultado> {
        &self.docs
    }

    /// Filter matching the participant's enrollment
    pub fn by_inscricao(inscricao: &str) -> Filter {
        Filter::new().eq("participante_inscricao", inscricao)
    }

    /// Filter matching the natural key
    pub fn by_sequencial(nu_sequencial: &str) -> Filter {
        Filter::new().eq("nu_sequencial", nu_sequencial)
    }

    /// Results with at least one score `>= nota_corte`
    pub fn destaque(nota_corte: f64) -> Filter {
        Filter::new().any_gte(NOTA_FIELDS, nota_corte)
    }

    /// Mean and scored count per area over the whole collection
    pub async fn medias_gerais(&self) -> Result<AreaCountsRow, StoreError> {
        let row = sqlx::query_as::<_, AreaCountsRow>(&format!(
            "SELECT {}, \
                    COUNT(doc ->> '$.nota_cn') AS count_cn, \
                    COUNT(doc ->> '$.nota_ch') AS count_ch, \
                    COUNT(doc ->> '$.nota_lc') AS count_lc, \
                    COUNT(doc ->> '$.nota_mt') AS count_mt, \
                    COUNT(doc ->> '$.nota_redacao') AS count_redacao \
             FROM resultados",
            AREA_MEANS_SQL
        ))
        .fetch_one(self.docs.pool())
        .await?;
        Ok(row)
    }

    /// Per exam state means, states without a known abbreviation excluded
    pub async fn medias_por_uf(&self) -> Result<Vec<RankingUfRow>, StoreError> {
        let rows = sqlx::query_as::<_, RankingUfRow>(&format!(
            "SELECT doc ->> '$.uf_prova_sigla' AS uf, {} \
             FROM resultados \
             WHERE doc ->> '$.uf_prova_sigla' IS NOT NULL \
             GROUP BY doc ->> '$.uf_prova_sigla'",
            AREA_MEANS_SQL
        ))
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Essay score grouped by bracket
    pub async fn distribuicao_redacao(&self) -> Result<Vec<RedacaoBracketRow>, StoreError> {
        let expr = "doc ->> '$.nota_redacao'";
        let rows = sqlx::query_as::<_, RedacaoBracketRow>(&format!(
            "SELECT {case} AS faixa, COUNT(*) AS total, \
                    AVG({e}) AS media, \
                    CAST(SUM({e}) AS REAL) AS soma, \
                    CAST(MIN({e}) AS REAL) AS minima, \
                    CAST(MAX({e}) AS REAL) AS maxima \
             FROM resultados GROUP BY faixa ORDER BY faixa",
            case = bracket_case_sql(expr, &REDACAO_BRACKETS),
            e = expr
        ))
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Count and per-area means of the results matching `filter`
    pub async fn medias_filtradas(&self, filter: &Filter) -> Result<AreaMeansRow, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM resultados", AREA_MEANS_SQL));
        filter.push_where(&mut qb);
        let row = qb
            .build_query_as::<AreaMeansRow>()
            .fetch_one(self.docs.pool())
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resultado(seq: &str, uf: &str, notas: [Option<f64>; 5]) -> Resultado {
        Resultado {
            nu_sequencial: seq.to_string(),
            nu_ano: 2023,
            participante_inscricao: format!("P{}", seq),
            uf_prova_sigla: Some(uf.to_string()),
            nota_cn: notas[0],
            nota_ch: notas[1],
            nota_lc: notas[2],
            nota_mt: notas[3],
            nota_redacao: notas[4],
            ..Default::default()
        }
        .with_derived_fields()
    }

    async fn seeded() -> ResultadoRepository {
        let db = Database::in_memory().await.unwrap();
        let repo = ResultadoRepository::new(&db);
        let rows = [
            resultado("1", "SP", [Some(500.0), Some(600.0), Some(550.0), Some(700.0), Some(900.0)]),
            resultado("2", "SP", [Some(400.0), None, Some(450.0), Some(500.0), Some(1000.0)]),
            resultado("3", "RJ", [None, None, None, None, None]),
            resultado("4", "RJ", [Some(650.0), Some(620.0), Some(610.0), Some(800.0), Some(180.0)]),
        ];
        for r in rows {
            repo.docs().insert(r).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_medias_gerais_counts_scored_rows() {
        let repo = seeded().await;
        let row = repo.medias_gerais().await.unwrap();
        assert_eq!(row.medias.total, 4);
        assert_eq!(row.counts(), [3, 2, 3, 3, 3]);
        assert_eq!(row.medias.media_ch, Some(610.0));
    }

    #[tokio::test]
    async fn test_distribuicao_redacao_buckets() {
        let repo = seeded().await;
        let rows = repo.distribuicao_redacao().await.unwrap();

        let invalid = rows.iter().find(|r| r.faixa == -1).unwrap();
        assert_eq!(invalid.total, 1);

        let excelente = rows.iter().find(|r| r.faixa == 4).unwrap();
        assert_eq!(excelente.total, 2);
        assert_eq!(excelente.maxima, Some(1000.0));
        assert_eq!(excelente.minima, Some(900.0));
    }

    #[tokio::test]
    async fn test_medias_por_uf_and_destaque() {
        let repo = seeded().await;
        let ufs = repo.medias_por_uf().await.unwrap();
        assert_eq!(ufs.len(), 2);
        let rj = ufs.iter().find(|r| r.uf == "RJ").unwrap();
        assert_eq!(rj.medias.total, 2);
        assert_eq!(rj.medias.media_mt, Some(800.0));

        let count = repo.docs().count(&ResultadoRepository::destaque(850.0)).await.unwrap();
        assert_eq!(count, 2);
    }
}
