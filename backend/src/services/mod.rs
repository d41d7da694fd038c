//! Service layer
//!
//! Services sit between the HTTP handlers and the repositories: they validate
//! input, shape statistics into response documents (percentages, labels,
//! rankings) and log every operation. Statistics never fail the request: a
//! storage error is logged and an empty result returned.

pub mod area;
pub mod escola;
pub mod municipio;
pub mod participante;
pub mod resultado;

pub use area::AreaService;
pub use escola::EscolaService;
pub use municipio::MunicipioService;
pub use participante::ParticipanteService;
pub use resultado::ResultadoService;

use crate::error::AppError;
use crate::models::{into_patch, Validate, AREAS};
use crate::repositories::AreaMeansRow;
use crate::stats::round2;
use crate::store::{Collection, Document, Filter, Page, Record, Sort, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{error, info, warn};

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    /// Documents of the page
    pub items: Vec<T>,
    /// Documents matching the filters
    pub total: i64,
    /// Documents skipped
    pub skip: u64,
    /// Page size
    pub limit: u64,
    /// Whether documents remain after this page
    pub has_more: bool,
    /// 1-based page number
    pub current_page: u64,
    /// Pages needed for `total` documents
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    /// Wrap `items` fetched with `page` out of `total` matches
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        let total_u = total.max(0) as u64;
        let limit = page.limit.max(1);
        Self {
            items,
            total,
            skip: page.skip,
            limit: page.limit,
            has_more: page.skip + page.limit < total_u,
            current_page: page.skip / limit + 1,
            total_pages: total_u.div_ceil(limit),
        }
    }
}

/// Outcome of an update or delete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResponse {
    /// Always true; failures are reported as errors
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Affected document id
    pub id: String,
}

/// User-facing messages of one entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityMessages {
    /// Entity name for logs
    pub name: &'static str,
    /// 404 message
    pub not_found: &'static str,
    /// Update success message
    pub updated: &'static str,
    /// Delete success message
    pub deleted: &'static str,
}

/// Message returned when an update request carries no field
pub const NOTHING_TO_UPDATE: &str = "Nenhum dado para atualizar";

/// CRUD operations shared by every entity service
pub struct Crud<T> {
    docs: Collection<T>,
    messages: EntityMessages,
}

impl<T: Document + Validate> Crud<T> {
    /// CRUD over `docs`, reporting with `messages`
    pub fn new(docs: Collection<T>, messages: EntityMessages) -> Self {
        Self { docs, messages }
    }

    /// Validate and insert a document
    pub async fn create(&self, doc: T) -> Result<Record<T>, AppError> {
        doc.validate().map_err(AppError::Validation)?;
        let record = self.docs.insert(doc).await.map_err(|e| {
            warn!("Failed to create {}: {}", self.messages.name, e);
            e
        })?;
        info!("Created {} {}", self.messages.name, record.id);
        Ok(record)
    }

    /// Document by store id, 404 when absent
    pub async fn get(&self, id: &str) -> Result<Record<T>, AppError> {
        match self.docs.find_by_id(id).await? {
            Some(record) => Ok(record),
            None => {
                warn!("{} not found for id {}", self.messages.name, id);
                Err(AppError::NotFound(self.messages.not_found.to_string()))
            }
        }
    }

    /// First document matching `filter`, 404 when absent
    pub async fn get_by(&self, filter: &Filter, key: impl Display) -> Result<Record<T>, AppError> {
        match self.docs.find_one(filter).await? {
            Some(record) => Ok(record),
            None => {
                warn!("{} not found for key {}", self.messages.name, key);
                Err(AppError::NotFound(self.messages.not_found.to_string()))
            }
        }
    }

    /// One page of the documents matching `filter`
    pub async fn list(&self, filter: &Filter, sort: Sort, page: Page) -> Result<Paginated<Record<T>>, AppError> {
        let items = self.docs.find(filter, sort, Some(page)).await?;
        let total = self.docs.count(filter).await?;
        info!(
            "Listed {} {} documents (total {})",
            items.len(),
            self.messages.name,
            total
        );
        Ok(Paginated::new(items, total, page))
    }

    /// Apply the present fields of `update` to a document
    pub async fn update<U: Serialize + Validate>(&self, id: &str, update: &U) -> Result<OperationResponse, AppError> {
        update.validate().map_err(AppError::Validation)?;
        let patch = into_patch(update).map_err(StoreError::from)?;
        if patch.is_empty() {
            return Err(AppError::Validation(NOTHING_TO_UPDATE.to_string()));
        }

        if !self.docs.update(id, &patch).await? {
            warn!("{} not found for update: {}", self.messages.name, id);
            return Err(AppError::NotFound(self.messages.not_found.to_string()));
        }
        info!("Updated {} {} ({} fields)", self.messages.name, id, patch.len());
        Ok(OperationResponse {
            success: true,
            message: self.messages.updated.to_string(),
            id: id.to_string(),
        })
    }

    /// Hard-delete a document
    pub async fn delete(&self, id: &str) -> Result<OperationResponse, AppError> {
        if !self.docs.delete(id).await? {
            warn!("{} not found for delete: {}", self.messages.name, id);
            return Err(AppError::NotFound(self.messages.not_found.to_string()));
        }
        info!("Deleted {} {}", self.messages.name, id);
        Ok(OperationResponse {
            success: true,
            message: self.messages.deleted.to_string(),
            id: id.to_string(),
        })
    }
}

/// Rounded per-area means keyed by area key (`ciencias_natureza`, ..., `redacao`)
pub fn medias_por_area(row: &AreaMeansRow) -> BTreeMap<&'static str, Option<f64>> {
    AREAS
        .iter()
        .zip(row.means())
        .map(|(area, media)| (area.chave, media.map(round2)))
        .collect()
}

/// Unwrap a statistic, logging the failure and falling back to an empty result
pub(crate) fn or_default<T: Default>(statistic: &str, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        error!("Failed to compute {}: {}", statistic, e);
        T::default()
    })
}
