//! # SQL Identifier Policy
//!
//! Schema, table, column and function names arrive in the job payload and end
//! up in SQL text, so they are validated, optionally checked against an
//! allow-list, and always double-quoted. Values are still bound as parameters.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::errors::StoreError;
use crate::models::Job;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("Valid regex pattern"))
}

/// Quote a single identifier after validating it
pub fn quote_ident(identifier: &str) -> Result<String, StoreError> {
    if !identifier_pattern().is_match(identifier) {
        return Err(StoreError::rejected_identifier(
            identifier,
            "identifiers must match [A-Za-z_][A-Za-z0-9_]* and be at most 63 characters",
        ));
    }
    Ok(format!("\"{identifier}\""))
}

/// Quote a possibly schema-qualified name such as `util.document_content`
pub fn quote_qualified(name: &str) -> Result<String, StoreError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(StoreError::rejected_identifier(
            name,
            "qualified names may have at most one schema segment",
        ));
    }
    let quoted = segments
        .into_iter()
        .map(quote_ident)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join("."))
}

/// Quoted identifiers for one job's row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedTarget {
    pub schema: String,
    pub table: String,
    pub content_function: String,
    pub embedding_column: String,
}

/// Which `schema.table` pairs the store may touch
#[derive(Debug, Clone, Default)]
pub struct IdentifierPolicy {
    allowed_tables: HashSet<(String, String)>,
}

impl IdentifierPolicy {
    /// Accept any syntactically valid identifier
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Restrict to `schema.table` entries; an empty list is permissive
    pub fn from_allowed_tables<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_tables = entries
            .into_iter()
            .filter_map(|entry| {
                entry
                    .as_ref()
                    .split_once('.')
                    .map(|(schema, table)| (schema.to_string(), table.to_string()))
            })
            .collect();
        Self { allowed_tables }
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed_tables.is_empty()
    }

    /// Validate and quote every identifier a job refers to
    pub fn resolve(&self, job: &Job) -> Result<QuotedTarget, StoreError> {
        if self.is_restricted()
            && !self
                .allowed_tables
                .contains(&(job.schema_name.clone(), job.table_name.clone()))
        {
            return Err(StoreError::rejected_identifier(
                format!("{}.{}", job.schema_name, job.table_name),
                "table is not on the allow-list",
            ));
        }

        Ok(QuotedTarget {
            schema: quote_ident(&job.schema_name)?,
            table: quote_ident(&job.table_name)?,
            content_function: quote_qualified(&job.content_function_name)?,
            embedding_column: quote_ident(&job.embedding_column_name)?,
        })
    }
}
