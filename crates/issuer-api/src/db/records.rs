//! Postgres-backed record lookup for queryable attestations.
//!
//! Each row is returned as its `to_jsonb` object, so every column becomes
//! a field mapping paths can address. Table and column names are SQL
//! identifiers checked when the attestation definition was registered;
//! they are additionally quoted here.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use issuer_engine::{AttestationRecord, RecordLookup, RecordQuery, StoreError};

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE for `undefined_column`.
const UNDEFINED_COLUMN: &str = "42703";

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Build the lookup statement.
///
/// `ctid` is only a physical tie-breaker: it is stable between
/// statements but moves on UPDATE and is reused after VACUUM, so it does
/// not track write order. Definitions over tables holding several rows
/// per holder should set `order_by` (e.g. `created_at`).
pub(crate) fn lookup_sql(query: &RecordQuery<'_>) -> String {
    let order = match query.order_by {
        Some(column) => format!("t.{} DESC NULLS LAST, t.ctid DESC", quote_ident(column)),
        None => "t.ctid DESC".to_string(),
    };
    format!(
        "SELECT to_jsonb(t) FROM {} t WHERE t.{}::text = $1 ORDER BY {} LIMIT 1",
        quote_ident(query.table),
        quote_ident(query.match_column),
        order
    )
}

fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some(UNDEFINED_TABLE | UNDEFINED_COLUMN)) =>
        {
            StoreError::InvalidQuery(db.message().to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl RecordLookup for PgRecordStore {
    async fn lookup(
        &self,
        query: &RecordQuery<'_>,
    ) -> Result<Option<AttestationRecord>, StoreError> {
        let sql = lookup_sql(query);
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(query.value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, table = query.table, "record lookup failed");
                store_error(e)
            })?;

        match row {
            None => Ok(None),
            Some(Value::Object(record)) => Ok(Some(record)),
            Some(other) => Err(StoreError::InvalidQuery(format!(
                "row is not a JSON object: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(order_by: Option<&'static str>) -> RecordQuery<'static> {
        RecordQuery {
            table: "membership_attestations",
            match_column: "holder_id",
            value: "holder-1",
            order_by,
        }
    }

    #[test]
    fn sql_without_ordering_breaks_ties_on_ctid() {
        assert_eq!(
            lookup_sql(&query(None)),
            "SELECT to_jsonb(t) FROM \"membership_attestations\" t \
             WHERE t.\"holder_id\"::text = $1 ORDER BY t.ctid DESC LIMIT 1"
        );
    }

    #[test]
    fn sql_with_ordering_column() {
        let sql = lookup_sql(&query(Some("membership_start_date")));
        assert!(sql.contains("ORDER BY t.\"membership_start_date\" DESC NULLS LAST, t.ctid DESC"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
