use crate::models::Participante;
use crate::store::{field_expr, Collection, Database, Filter, StoreError};
use sqlx::{FromRow, QueryBuilder, Sqlite};

/// Participants grouped by one demographic field
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ParticipanteGroupRow {
    /// Integer group key (age bracket, race)
    pub codigo: Option<i64>,
    /// Text group key (sex, state)
    pub chave: Option<String>,
    /// Participants in the group
    pub total: i64,
    /// Participants flagged as `treineiro`
    pub treineiros: i64,
}

/// Participant collection and its aggregations
#[derive(Clone)]
pub struct ParticipanteRepository {
    docs: Collection<Participante>,
}

/// Grouping key of a demographic breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKey {
    Int(&'static str),
    Text(&'static str),
}

impl ParticipanteRepository {
    /// Repository over the `participantes` collection
    pub fn new(db: &Database) -> Self {
        Self {
            docs: db.collection(),
        }
    }

    /// Typed collection for CRUD
    pub fn docs(&self) -> &Collection<Participante> {
        &self.docs
    }

    /// Filter matching the natural key
    pub fn by_inscricao(nu_inscricao: &str) -> Filter {
        Filter::new().eq("nu_inscricao", nu_inscricao)
    }

    async fn agrupar(&self, key: GroupKey, filter: &Filter, descending: bool) -> Result<Vec<ParticipanteGroupRow>, StoreError> {
        let (codigo, chave) = match key {
            GroupKey::Int(field) => (field_expr(field), "NULL".to_string()),
            GroupKey::Text(field) => ("NULL".to_string(), field_expr(field)),
        };

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} AS codigo, {} AS chave, COUNT(*) AS total, \
                    COALESCE(SUM(CASE WHEN doc ->> '$.treineiro' THEN 1 ELSE 0 END), 0) AS treineiros \
             FROM participantes",
            codigo, chave
        ));
        filter.push_where(&mut qb);
        qb.push(" GROUP BY codigo, chave");
        if descending {
            qb.push(" ORDER BY total DESC, codigo, chave");
        } else {
            qb.push(" ORDER BY codigo, chave");
        }

        let rows = qb
            .build_query_as::<ParticipanteGroupRow>()
            .fetch_all(self.docs.pool())
            .await?;
        Ok(rows)
    }

    /// Participants per sex
    pub async fn por_sexo(&self) -> Result<Vec<ParticipanteGroupRow>, StoreError> {
        self.agrupar(GroupKey::Text("sexo"), &Filter::new(), true).await
    }

    /// Participants per age bracket, in bracket order
    pub async fn por_faixa_etaria(&self) -> Result<Vec<ParticipanteGroupRow>, StoreError> {
        self.agrupar(GroupKey::Int("faixa_etaria"), &Filter::new(), false)
            .await
    }

    /// Participants per race/ethnicity
    pub async fn por_cor_raca(&self) -> Result<Vec<ParticipanteGroupRow>, StoreError> {
        self.agrupar(GroupKey::Int("cor_raca"), &Filter::new(), true).await
    }

    /// Participants per exam state, optionally a single state
    pub async fn por_uf_prova(&self, uf: Option<&str>) -> Result<Vec<ParticipanteGroupRow>, StoreError> {
        let filter = Filter::new().not_null("uf_prova").eq_opt("uf_prova", uf);
        self.agrupar(GroupKey::Text("uf_prova"), &filter, true).await
    }
}
