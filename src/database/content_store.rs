//! # PostgreSQL Content Store
//!
//! sqlx-backed [`ContentStore`]: evaluates a job's content function against its
//! row and writes vectors into pgvector columns.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, TypeInfo, ValueRef};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::errors::StoreError;
use super::identifiers::{IdentifierPolicy, QuotedTarget};
use crate::models::{Job, RowId};
use crate::pipeline::{ContentStore, FetchedContent};

/// Postgres type names whose values count as embeddable content
const TEXT_TYPE_NAMES: [&str; 4] = ["TEXT", "VARCHAR", "BPCHAR", "NAME"];

const ID_TYPE_SQL: &str = "SELECT format_type(a.atttypid, a.atttypmod) AS id_type \
     FROM pg_catalog.pg_attribute a \
     WHERE a.attrelid = to_regclass($1) AND a.attname = 'id' AND NOT a.attisdropped";

#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
    policy: IdentifierPolicy,
    /// Declared type of `id`, keyed by quoted `schema.table`; `None` when unresolvable
    id_types: Arc<DashMap<String, Option<String>>>,
}

impl PgContentStore {
    pub fn new(pool: PgPool, policy: IdentifierPolicy) -> Self {
        Self {
            pool,
            policy,
            id_types: Arc::new(DashMap::new()),
        }
    }

    /// Declared type of the target's `id` column, looked up once per table.
    /// Only text ids need it; integer ids already bind as `BIGINT`.
    async fn id_type(
        &self,
        target: &QuotedTarget,
        row_id: &RowId,
    ) -> Result<Option<String>, StoreError> {
        if matches!(row_id, RowId::Int(_)) {
            return Ok(None);
        }

        let relation = format!("{}.{}", target.schema, target.table);
        if let Some(cached) = self.id_types.get(&relation).map(|entry| entry.value().clone()) {
            return Ok(cached);
        }

        let id_type: Option<String> = sqlx::query_scalar(ID_TYPE_SQL)
            .bind(relation.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if id_type.is_none() {
            debug!(relation = %relation, "Could not resolve id column type, comparing as text");
        }

        self.id_types.insert(relation, id_type.clone());
        Ok(id_type)
    }
}

/// Predicate on the row id. Text ids are cast to the column's declared type so
/// the primary key index stays usable; without a known type the column is
/// compared in text form.
fn id_predicate(row_id: &RowId, placeholder: &str, id_type: Option<&str>) -> String {
    match (row_id, id_type) {
        (RowId::Int(_), _) => format!("t.id = {placeholder}"),
        (RowId::Text(_), Some(id_type)) => format!("t.id = {placeholder}::{id_type}"),
        (RowId::Text(_), None) => format!("t.id::text = {placeholder}"),
    }
}

fn bind_row_id<'q>(
    query: Query<'q, Postgres, PgArguments>,
    row_id: &'q RowId,
) -> Query<'q, Postgres, PgArguments> {
    match row_id {
        RowId::Int(id) => query.bind(*id),
        RowId::Text(id) => query.bind(id.as_str()),
    }
}

pub(crate) fn select_content_sql(
    target: &QuotedTarget,
    row_id: &RowId,
    id_type: Option<&str>,
) -> String {
    format!(
        "SELECT {function}(t) AS content FROM {schema}.{table} AS t WHERE {predicate}",
        function = target.content_function,
        schema = target.schema,
        table = target.table,
        predicate = id_predicate(row_id, "$1", id_type),
    )
}

pub(crate) fn update_vector_sql(
    target: &QuotedTarget,
    row_id: &RowId,
    id_type: Option<&str>,
) -> String {
    format!(
        "UPDATE {schema}.{table} AS t SET {column} = $1::vector WHERE {predicate}",
        schema = target.schema,
        table = target.table,
        column = target.embedding_column,
        predicate = id_predicate(row_id, "$2", id_type),
    )
}

pub(crate) fn is_text_type(type_name: &str) -> bool {
    TEXT_TYPE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(type_name))
}

/// Content column as text; SQL NULL and non-text return types read as `None`
fn read_content(row: &PgRow) -> Result<Option<String>, StoreError> {
    let textual = {
        let raw = row.try_get_raw("content")?;
        if raw.is_null() {
            return Ok(None);
        }
        let type_info = raw.type_info();
        let textual = is_text_type(type_info.name());
        if !textual {
            debug!(content_type = type_info.name(), "Content function returned a non-text type");
        }
        textual
    };

    if !textual {
        return Ok(None);
    }
    Ok(row.try_get("content")?)
}

/// pgvector text literal, e.g. `[0.1,0.2]`
pub(crate) fn vector_literal(vector: &[f32]) -> Result<String, StoreError> {
    serde_json::to_string(vector).map_err(|e| StoreError::query("encode_vector", e.to_string()))
}

#[async_trait]
impl ContentStore for PgContentStore {
    #[instrument(skip(self, job), fields(job_id = job.job_id))]
    async fn fetch_content(&self, job: &Job) -> Result<Option<FetchedContent>, StoreError> {
        let target = self.policy.resolve(job)?;
        let id_type = self.id_type(&target, &job.row_id).await?;
        let sql = select_content_sql(&target, &job.row_id, id_type.as_deref());

        let row = bind_row_id(sqlx::query(&sql), &job.row_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!(row = %job.row_label(), "No row matched content lookup");
            return Ok(None);
        };

        Ok(Some(FetchedContent {
            row_id: job.row_id.clone(),
            content: read_content(&row)?,
        }))
    }

    #[instrument(skip(self, job, vector), fields(job_id = job.job_id, dimensions = vector.len()))]
    async fn update_vector(&self, job: &Job, vector: &[f32]) -> Result<u64, StoreError> {
        let target = self.policy.resolve(job)?;
        let id_type = self.id_type(&target, &job.row_id).await?;
        let sql = update_vector_sql(&target, &job.row_id, id_type.as_deref());
        let literal = vector_literal(vector)?;

        let query = sqlx::query(&sql).bind(literal);
        let result = bind_row_id(query, &job.row_id).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}
