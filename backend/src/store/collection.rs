//! Typed document collections
//!
//! A collection is a table `(id, doc, created_at, updated_at)` whose `doc`
//! column holds the JSON-serialized document.

use crate::store::error::StoreError;
use crate::store::filter::{Filter, Page, Sort};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

/// A document type stored in its own collection
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Table holding documents of this type
    const COLLECTION: &'static str;
}

/// A stored document together with its identity and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Store-assigned identifier (uuid v4)
    pub id: String,
    /// When the document was inserted
    pub created_at: DateTime<Utc>,
    /// When the document was last modified
    pub updated_at: DateTime<Utc>,
    /// Document fields
    #[serde(flatten)]
    pub doc: T,
}

#[derive(Debug, FromRow)]
struct DocRow {
    id: String,
    doc: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocRow {
    fn into_record<T: Document>(self) -> Result<Record<T>, StoreError> {
        Ok(Record {
            doc: serde_json::from_str(&self.doc)?,
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Handle to the collection of `T` documents
pub struct Collection<T> {
    pool: SqlitePool,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _doc: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _doc: PhantomData,
        }
    }

    /// Pool backing this collection (for aggregation queries)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn select() -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(format!(
            "SELECT id, doc, created_at, updated_at FROM {}",
            T::COLLECTION
        ))
    }

    /// Insert a new document and return the stored record
    pub async fn insert(&self, doc: T) -> Result<Record<T>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, doc).await
    }

    /// Insert a document on an existing connection (e.g. inside a transaction)
    pub async fn insert_with(conn: &mut SqliteConnection, doc: T) -> Result<Record<T>, StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(&doc)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, doc, created_at, updated_at) VALUES (?, ?, ?, ?)",
            T::COLLECTION
        ))
        .bind(&id)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::from_write(T::COLLECTION, e))?;

        debug!("Inserted {} document {}", T::COLLECTION, id);
        Ok(Record {
            id,
            created_at: now,
            updated_at: now,
            doc,
        })
    }

    /// Remove every document on an existing connection, returning how many were removed
    pub async fn delete_all_with(conn: &mut SqliteConnection) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {}", T::COLLECTION))
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetch a document by its store id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Record<T>>, StoreError> {
        let mut qb = Self::select();
        qb.push(" WHERE id = ").push_bind(id.to_string());
        let row = qb
            .build_query_as::<DocRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(DocRow::into_record).transpose()
    }

    /// First document matching `filter`
    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Record<T>>, StoreError> {
        let mut qb = Self::select();
        filter.push_where(&mut qb);
        qb.push(" LIMIT 1");
        let row = qb
            .build_query_as::<DocRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(DocRow::into_record).transpose()
    }

    /// Documents matching `filter` in `sort` order, optionally windowed by `page`
    pub async fn find(
        &self,
        filter: &Filter,
        sort: Sort,
        page: Option<Page>,
    ) -> Result<Vec<Record<T>>, StoreError> {
        let mut qb = Self::select();
        filter.push_where(&mut qb);
        sort.push_order_by(&mut qb);
        if let Some(page) = page {
            page.push_limit(&mut qb);
        }
        let rows = qb.build_query_as::<DocRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(DocRow::into_record).collect()
    }

    /// Number of documents matching `filter`
    pub async fn count(&self, filter: &Filter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Merge `patch` into the stored document (RFC 7396) and bump `updated_at`
    ///
    /// Returns `false` when no document has this id.
    pub async fn update(&self, id: &str, patch: &Map<String, Value>) -> Result<bool, StoreError> {
        let body = serde_json::to_string(patch)?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET doc = json_patch(doc, ?), updated_at = ? WHERE id = ?",
            T::COLLECTION
        ))
        .bind(body)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(T::COLLECTION, e))?;

        debug!("Updated {} document {}", T::COLLECTION, id);
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete a document. Returns `false` when no document has this id.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", T::COLLECTION))
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Deleted {} document {}", T::COLLECTION, id);
        Ok(result.rows_affected() > 0)
    }
}
