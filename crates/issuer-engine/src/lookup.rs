//! # Record Lookup
//!
//! Backing stores for queryable attestation sources. A store answers one
//! question: the single row of `table` whose `match_column` equals the
//! holder id, chosen by a consistent ordering when several rows match.
//!
//! - [`InMemoryRecordStore`]: rows kept per table in insertion order. With
//!   `order_by` the row with the greatest value wins; otherwise, and on
//!   ties, the most recently inserted row wins.
//! - The API crate provides a Postgres implementation.
//!
//! [`DataSources`] maps the `dataSourceName` of an attestation definition
//! to a concrete store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::source::AttestationRecord;

/// Failure of a backing store, as opposed to "no matching row".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the query failed.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The query itself was rejected.
    #[error("invalid record query: {0}")]
    InvalidQuery(String),
}

/// Equality lookup of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordQuery<'a> {
    pub table: &'a str,
    pub match_column: &'a str,
    pub value: &'a str,
    pub order_by: Option<&'a str>,
}

/// A store that can answer [`RecordQuery`]s.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// First matching row under the store's ordering, or `None`.
    async fn lookup(&self, query: &RecordQuery<'_>) -> Result<Option<AttestationRecord>, StoreError>;
}

// ─── In-Memory Store ─────────────────────────────────────────────────

/// Thread-safe in-memory tables of attestation rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, Vec<AttestationRecord>>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to `table`.
    pub fn insert(&self, table: impl Into<String>, row: AttestationRecord) {
        self.tables.write().entry(table.into()).or_default().push(row);
    }

    /// Append several rows to `table`, preserving their order.
    pub fn extend<I>(&self, table: impl Into<String>, rows: I)
    where
        I: IntoIterator<Item = AttestationRecord>,
    {
        self.tables.write().entry(table.into()).or_default().extend(rows);
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    fn find(&self, query: &RecordQuery<'_>) -> Option<AttestationRecord> {
        let tables = self.tables.read();
        let rows = tables.get(query.table)?;
        let matches = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.get(query.match_column)
                    .is_some_and(|v| column_text_eq(v, query.value))
            });

        let best = match query.order_by {
            Some(column) => matches.max_by(|(ia, a), (ib, b)| {
                compare_column(a.get(column), b.get(column)).then(ia.cmp(ib))
            }),
            None => matches.last(),
        };
        best.map(|(_, row)| row.clone())
    }
}

#[async_trait]
impl RecordLookup for InMemoryRecordStore {
    async fn lookup(&self, query: &RecordQuery<'_>) -> Result<Option<AttestationRecord>, StoreError> {
        Ok(self.find(query))
    }
}

/// Compare a column against the holder id the way `column::text = $1` does.
fn column_text_eq(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s == needle,
        Value::Number(n) => n.to_string() == needle,
        Value::Bool(b) => b.to_string() == needle,
        _ => false,
    }
}

/// Ordering for `order_by` columns. Missing and null sort lowest.
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

// ─── Data Source Registry ────────────────────────────────────────────

/// Named record stores available to queryable attestation sources.
#[derive(Clone, Default)]
pub struct DataSources {
    sources: BTreeMap<String, Arc<dyn RecordLookup>>,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration. Replaces any store under `name`.
    pub fn with_source(mut self, name: impl Into<String>, lookup: Arc<dyn RecordLookup>) -> Self {
        self.register(name, lookup);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, lookup: Arc<dyn RecordLookup>) {
        self.sources.insert(name.into(), lookup);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RecordLookup>> {
        self.sources.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSources")
            .field("names", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
