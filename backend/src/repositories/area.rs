use crate::models::{AreaConhecimento, ParticipanteArea};
use crate::stats::{bracket_case_sql, AREA_BRACKETS};
use crate::store::{Collection, Database, Filter, StoreError};
use sqlx::FromRow;

/// Knowledge area catalog
#[derive(Clone)]
pub struct AreaConhecimentoRepository {
    docs: Collection<AreaConhecimento>,
}

impl AreaConhecimentoRepository {
    /// Repository over the `areas_conhecimento` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<AreaConhecimento> {
        &self.docs
    }

    /// Filter matching the natural key
    pub fn by_codigo(codigo: &str) -> Filter {
        Filter::new().eq("codigo", codigo)
    }

    /// Listing filter: active areas only and a minimum weight
    pub fn listagem(ativas_apenas: bool, peso_minimo: Option<f64>) -> Filter {
        let filter = if ativas_apenas {
            Filter::new().eq("ativa", true)
        } else {
            Filter::new()
        };
        filter.gte_opt("peso_default", peso_minimo)
    }
}

/// Aggregates of one area's scores
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AreaGroupRow {
    /// Area code
    pub area_codigo: String,
    /// Scored rows
    pub total: i64,
    /// Mean score
    pub media: Option<f64>,
    /// Highest score
    pub maxima: Option<f64>,
    /// Lowest score
    pub minima: Option<f64>,
    /// Mean number of correct answers
    pub media_acertos: Option<f64>,
    /// Rows where the participant attended
    pub presentes: i64,
    /// Rows with score >= 700
    pub destaques: i64,
    /// Mean of squared scores (for the standard deviation)
    pub media_quadrados: Option<f64>,
}

impl AreaGroupRow {
    /// Population standard deviation of the scores
    pub fn desvio_padrao(&self) -> Option<f64> {
        let media = self.media?;
        let quadrados = self.media_quadrados?;
        Some((quadrados - media * media).max(0.0).sqrt())
    }
}

/// Row count of one score bracket
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BracketRow {
    /// Index into the bracket table, `-1` outside every bracket
    pub faixa: i64,
    /// Rows in the bracket
    pub total: i64,
    /// Mean score in the bracket
    pub media: Option<f64>,
}

/// Per participant and area scores
#[derive(Clone)]
pub struct ParticipanteAreaRepository {
    docs: Collection<ParticipanteArea>,
}

/// Score from which a row counts as a highlight
pub const NOTA_DESTAQUE: f64 = 700.0;

impl ParticipanteAreaRepository {
    /// Repository over the `participantes_areas` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<ParticipanteArea> {
        &self.docs
    }

    /// Rows of one area
    pub fn by_area(area_codigo: &str) -> Filter {
        Filter::new().eq("area_codigo", area_codigo)
    }

    /// Rows of one participant
    pub fn by_participante(inscricao: &str) -> Filter {
        Filter::new().eq("participante_inscricao", inscricao)
    }

    /// Score aggregates per area over scored rows, by area code
    pub async fn agregados_por_area(&self) -> Result<Vec<AreaGroupRow>, StoreError> {
        let rows = sqlx::query_as::<_, AreaGroupRow>(&format!(
            "SELECT doc ->> '$.area_codigo' AS area_codigo, \
                    COUNT(*) AS total, \
                    AVG(doc ->> '$.nota') AS media, \
                    CAST(MAX(doc ->> '$.nota') AS REAL) AS maxima, \
                    CAST(MIN(doc ->> '$.nota') AS REAL) AS minima, \
                    AVG(doc ->> '$.numero_acertos') AS media_acertos, \
                    COALESCE(SUM(CASE WHEN doc ->> '$.presenca' THEN 1 ELSE 0 END), 0) AS presentes, \
                    COALESCE(SUM(CASE WHEN doc ->> '$.nota' >= {} THEN 1 ELSE 0 END), 0) AS destaques, \
                    AVG((doc ->> '$.nota') * (doc ->> '$.nota')) AS media_quadrados \
             FROM participantes_areas \
             WHERE doc ->> '$.nota' IS NOT NULL \
             GROUP BY doc ->> '$.area_codigo' \
             ORDER BY area_codigo",
            NOTA_DESTAQUE
        ))
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }

    /// Scores of one area grouped into `AREA_BRACKETS`
    pub async fn distribuicao(&self, area_codigo: &str) -> Result<Vec<BracketRow>, StoreError> {
        let rows = sqlx::query_as::<_, BracketRow>(&format!(
            "SELECT {} AS faixa, COUNT(*) AS total, AVG(doc ->> '$.nota') AS media \
             FROM participantes_areas \
             WHERE doc ->> '$.area_codigo' = ? AND doc ->> '$.nota' IS NOT NULL \
             GROUP BY faixa ORDER BY faixa",
            bracket_case_sql("doc ->> '$.nota'", &AREA_BRACKETS)
        ))
        .bind(area_codigo)
        .fetch_all(self.docs.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(inscricao: &str, area: &str, nota: Option<f64>, presenca: bool) -> ParticipanteArea {
        ParticipanteArea {
            participante_inscricao: inscricao.to_string(),
            area_codigo: area.to_string(),
            ano_prova: 2023,
            nota,
            presenca,
            numero_acertos: nota.map(|n| (n / 25.0) as i64),
            codigo_prova: None,
        }
    }

    #[tokio::test]
    async fn test_agregados_por_area() {
        let db = Database::in_memory().await.unwrap();
        let repo = ParticipanteAreaRepository::new(&db);
        for r in [
            row("1", "MT", Some(600.0), true),
            row("2", "MT", Some(800.0), true),
            row("3", "MT", None, false),
            row("1", "CN", Some(450.0), true),
        ] {
            repo.docs().insert(r).await.unwrap();
        }

        let rows = repo.agregados_por_area().await.unwrap();
        assert_eq!(rows.len(), 2);
        let mt = rows.iter().find(|r| r.area_codigo == "MT").unwrap();
        assert_eq!(mt.total, 2);
        assert_eq!(mt.media, Some(700.0));
        assert_eq!(mt.maxima, Some(800.0));
        assert_eq!(mt.minima, Some(600.0));
        assert_eq!(mt.presentes, 2);
        assert_eq!(mt.destaques, 1);
        assert_eq!(mt.desvio_padrao(), Some(100.0));
    }

    #[tokio::test]
    async fn test_distribuicao_closes_last_bracket() {
        let db = Database::in_memory().await.unwrap();
        let repo = ParticipanteAreaRepository::new(&db);
        for (i, nota) in [150.0, 650.0, 1000.0, 950.0].iter().enumerate() {
            repo.docs()
                .insert(row(&i.to_string(), "LC", Some(*nota), true))
                .await
                .unwrap();
        }

        let rows = repo.distribuicao("LC").await.unwrap();
        let ultima = rows.iter().find(|r| r.faixa == 6).unwrap();
        assert_eq!(ultima.total, 2);
        assert!(rows.iter().all(|r| r.faixa != -1));
    }

    #[test]
    fn test_listagem_filter() {
        assert!(AreaConhecimentoRepository::listagem(false, None).is_empty());
        assert!(!AreaConhecimentoRepository::listagem(true, None).is_empty());
    }
}
