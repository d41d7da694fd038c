//! Repositories
//!
//! One repository per collection. Each wraps a typed `Collection` for CRUD
//! and holds the aggregation queries over that collection.

mod area;
mod escola;
mod municipio;
mod participante;
mod resultado;

pub use area::{AreaConhecimentoRepository, AreaGroupRow, BracketRow, ParticipanteAreaRepository};
pub use escola::{EscolaGroupRow, EscolaRepository, RankingEscolaRow};
pub use municipio::{MunicipioRepository, PopulacaoExtremoRow, RegiaoRow, UfCountRow};
pub use participante::{ParticipanteGroupRow, ParticipanteRepository};
pub use resultado::{AreaCountsRow, RankingUfRow, RedacaoBracketRow, ResultadoRepository};

use sqlx::FromRow;

/// Mean score per area plus the number of rows aggregated
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct AreaMeansRow {
    /// Rows aggregated
    pub total: i64,
    /// Mean CN score
    pub media_cn: Option<f64>,
    /// Mean CH score
    pub media_ch: Option<f64>,
    /// Mean LC score
    pub media_lc: Option<f64>,
    /// Mean MT score
    pub media_mt: Option<f64>,
    /// Mean essay score
    pub media_redacao: Option<f64>,
}

impl AreaMeansRow {
    /// Means in catalog order (CN, CH, LC, MT, RE)
    pub fn means(&self) -> [Option<f64>; 5] {
        [
            self.media_cn,
            self.media_ch,
            self.media_lc,
            self.media_mt,
            self.media_redacao,
        ]
    }
}

/// Select list computing `AreaMeansRow` over `resultados` documents
pub(crate) const AREA_MEANS_SQL: &str = "COUNT(*) AS total, \
     AVG(doc ->> '$.nota_cn') AS media_cn, \
     AVG(doc ->> '$.nota_ch') AS media_ch, \
     AVG(doc ->> '$.nota_lc') AS media_lc, \
     AVG(doc ->> '$.nota_mt') AS media_mt, \
     AVG(doc ->> '$.nota_redacao') AS media_redacao";
