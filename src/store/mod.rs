// src/store/mod.rs

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use thiserror::Error;

/// Rows per ranged request.
pub const PAGE_SIZE: i64 = 1000;
/// Hard safety cap on the pagination loop: 50 pages = 50,000 rows.
pub const MAX_PAGES: usize = 50;

/// One logical ranged query. `from` may carry a join so the session fetch
/// can embed the roster row as a nested JSON object.
#[derive(Debug, Clone)]
pub struct TableQuery {
    /// Short name for logs.
    pub label: &'static str,
    pub from: String,
    pub select: String,
    /// Column that must be non-null, if any.
    pub not_null: Option<String>,
    /// Single-column descending sort, if any.
    pub order_desc: Option<String>,
}

impl TableQuery {
    pub fn table(label: &'static str, table: &str) -> Self {
        Self {
            label,
            from: table.to_string(),
            select: "*".to_string(),
            not_null: None,
            order_desc: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote query failed; `code` is the store's structured error code
    /// (e.g. Postgres `42P01`) and is preserved so callers can branch on it.
    #[error("query failed: {message}")]
    Query {
        code: Option<String>,
        message: String,
    },
}

impl StoreError {
    /// Expected-absence condition: the schema variant we asked about does
    /// not exist (undefined table or undefined column), as opposed to a
    /// genuine fault.
    pub fn is_missing_schema(&self) -> bool {
        match self {
            StoreError::Query { code: Some(c), .. } => c == "42P01" || c == "42703",
            StoreError::Query { code: None, .. } => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => StoreError::Query {
                code: db.code().map(|c| c.to_string()),
                message: db.message().to_string(),
            },
            other => StoreError::Query {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// One page of rows from the remote store. Abstracted so the pagination
/// loop is testable against an in-memory source.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_page(
        &self,
        query: &TableQuery,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Value>, StoreError>;
}

pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn fetch_page(
        &self,
        query: &TableQuery,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Value>, StoreError> {
        // Rows come back as one JSON object each so the field-alias layer
        // can inspect whatever columns the customer's schema actually has.
        let mut inner = format!("SELECT {} FROM {}", query.select, query.from);
        if let Some(col) = &query.not_null {
            let _ = write!(inner, " WHERE {col} IS NOT NULL");
        }
        if let Some(col) = &query.order_desc {
            let _ = write!(inner, " ORDER BY {col} DESC NULLS LAST");
        }
        let _ = write!(inner, " LIMIT $1 OFFSET $2");
        let sql = format!("SELECT row_to_json(q) AS row FROM ({inner}) q");

        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.try_get::<Value, _>("row").map_err(StoreError::from)?);
        }
        Ok(out)
    }
}

/// Retrieves every row of `query`, page by page, until a short page arrives
/// or the safety cap fires. The cap truncates with a warning rather than
/// erroring. A failed page aborts the fetch and propagates the original
/// error, code intact, for the caller's fallback decision. `silent`
/// downgrades fetch logging for speculative attempts that are expected to
/// sometimes fail.
pub async fn fetch_all_rows<S: RowSource + ?Sized>(
    source: &S,
    query: &TableQuery,
    silent: bool,
) -> Result<Vec<Value>, StoreError> {
    let mut rows: Vec<Value> = Vec::new();

    for page in 0..MAX_PAGES {
        let offset = page as i64 * PAGE_SIZE;
        let batch = match source.fetch_page(query, offset, PAGE_SIZE).await {
            Ok(batch) => batch,
            Err(err) => {
                if silent {
                    tracing::debug!(table = query.label, error = %err, "speculative fetch failed");
                } else {
                    tracing::error!(table = query.label, error = %err, "fetch failed");
                }
                return Err(err);
            }
        };

        let short_page = (batch.len() as i64) < PAGE_SIZE;
        rows.extend(batch);

        if short_page {
            if silent {
                tracing::debug!(table = query.label, rows = rows.len(), pages = page + 1, "fetch complete");
            } else {
                tracing::info!(table = query.label, rows = rows.len(), pages = page + 1, "fetch complete");
            }
            return Ok(rows);
        }
    }

    // Warn even in silent mode: hitting the cap means real data was cut off.
    tracing::warn!(
        table = query.label,
        rows = rows.len(),
        "row cap reached after {MAX_PAGES} pages, result truncated"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockSource {
        pages: Vec<usize>,
        calls: Mutex<Vec<(i64, i64)>>,
    }

    impl MockSource {
        fn new(pages: Vec<usize>) -> Self {
            Self {
                pages,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RowSource for MockSource {
        async fn fetch_page(
            &self,
            _query: &TableQuery,
            offset: i64,
            limit: i64,
        ) -> Result<Vec<Value>, StoreError> {
            let mut calls = self.calls.lock().unwrap();
            let idx = calls.len();
            calls.push((offset, limit));
            let n = self.pages.get(idx).copied().unwrap_or(0);
            Ok((0..n).map(|i| json!({ "id": offset + i as i64 })).collect())
        }
    }

    fn query() -> TableQuery {
        TableQuery::table("sessions", "public.sessions")
    }

    #[tokio::test]
    async fn stops_on_short_page_and_concatenates() {
        let source = MockSource::new(vec![1000, 1000, 400]);
        let rows = fetch_all_rows(&source, &query(), false).await.unwrap();
        assert_eq!(rows.len(), 2400);
        assert_eq!(source.call_count(), 3);

        let calls = source.calls.lock().unwrap();
        assert_eq!(*calls, vec![(0, 1000), (1000, 1000), (2000, 1000)]);
    }

    #[tokio::test]
    async fn stops_immediately_on_empty_table() {
        let source = MockSource::new(vec![0]);
        let rows = fetch_all_rows(&source, &query(), true).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn safety_cap_truncates_unbounded_sources() {
        let source = MockSource::new(vec![1000; 80]);
        let rows = fetch_all_rows(&source, &query(), false).await.unwrap();
        assert_eq!(rows.len(), 50_000);
        assert_eq!(source.call_count(), MAX_PAGES);
    }

    #[tokio::test]
    async fn page_failure_propagates_the_original_code() {
        struct FailingSource;

        #[async_trait]
        impl RowSource for FailingSource {
            async fn fetch_page(
                &self,
                _query: &TableQuery,
                _offset: i64,
                _limit: i64,
            ) -> Result<Vec<Value>, StoreError> {
                Err(StoreError::Query {
                    code: Some("42P01".to_string()),
                    message: "relation \"public.employees\" does not exist".to_string(),
                })
            }
        }

        let err = fetch_all_rows(&FailingSource, &query(), true)
            .await
            .unwrap_err();
        assert!(err.is_missing_schema());
    }

    #[test]
    fn missing_schema_covers_table_and_column() {
        let table = StoreError::Query {
            code: Some("42P01".into()),
            message: String::new(),
        };
        let column = StoreError::Query {
            code: Some("42703".into()),
            message: String::new(),
        };
        let fault = StoreError::Query {
            code: Some("57P01".into()),
            message: String::new(),
        };
        assert!(table.is_missing_schema());
        assert!(column.is_missing_schema());
        assert!(!fault.is_missing_schema());
    }
}
