//! # Attestation Sources
//!
//! An attestation source resolves a holder id to one attestation record.
//! The orchestrator only sees the [`AttestationSource`] trait; each
//! [`SourceConfig`] variant maps to one implementation here, and a new
//! kind of source is a new implementation plus a new variant.
//!
//! Sources are read-only. "No record for this holder" ([`SourceError::NotFound`])
//! is kept apart from "could not ask" ([`SourceError::Unavailable`]) so the
//! failure detail reported to the caller says which one happened.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use issuer_core::HolderId;

use crate::lookup::{DataSources, RecordLookup, RecordQuery};
use crate::model::{QueryConfig, SourceConfig};

/// A resolved attestation: named fields, flat or nested.
pub type AttestationRecord = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("no attestation record for holder {holder}")]
    NotFound { holder: String },

    #[error("attestation source unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the attestation record for a holder.
#[async_trait]
pub trait AttestationSource: Send + Sync {
    async fn resolve(&self, holder: &HolderId) -> Result<AttestationRecord, SourceError>;
}

/// Returns the configured record regardless of the holder.
#[derive(Debug, Clone)]
pub struct StaticSource {
    record: AttestationRecord,
}

impl StaticSource {
    pub fn new(record: AttestationRecord) -> Self {
        Self { record }
    }
}

#[async_trait]
impl AttestationSource for StaticSource {
    async fn resolve(&self, _holder: &HolderId) -> Result<AttestationRecord, SourceError> {
        Ok(self.record.clone())
    }
}

/// Looks the holder up in a backing record store.
pub struct QueryableSource {
    lookup: Arc<dyn RecordLookup>,
    config: QueryConfig,
}

impl QueryableSource {
    pub fn new(lookup: Arc<dyn RecordLookup>, config: QueryConfig) -> Self {
        Self { lookup, config }
    }
}

#[async_trait]
impl AttestationSource for QueryableSource {
    async fn resolve(&self, holder: &HolderId) -> Result<AttestationRecord, SourceError> {
        let query = RecordQuery {
            table: &self.config.table_name,
            match_column: &self.config.id_column,
            value: holder.as_str(),
            order_by: self.config.order_by.as_deref(),
        };
        match self.lookup.lookup(&query).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SourceError::NotFound {
                holder: holder.to_string(),
            }),
            Err(e) => Err(SourceError::Unavailable(e.to_string())),
        }
    }
}

/// Build the source for an attestation definition's configuration.
///
/// Fails with `Unavailable` when a queryable source names a data source
/// the engine does not know.
pub fn source_for(
    config: &SourceConfig,
    data_sources: &DataSources,
) -> Result<Arc<dyn AttestationSource>, SourceError> {
    match config {
        SourceConfig::Static { record } => Ok(Arc::new(StaticSource::new(record.clone()))),
        SourceConfig::Queryable(query) => {
            let lookup = data_sources.get(&query.data_source_name).ok_or_else(|| {
                SourceError::Unavailable(format!(
                    "data source {:?} is not configured",
                    query.data_source_name
                ))
            })?;
            Ok(Arc::new(QueryableSource::new(lookup, query.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{InMemoryRecordStore, StoreError};
    use serde_json::json;

    struct DownStore;

    #[async_trait]
    impl RecordLookup for DownStore {
        async fn lookup(
            &self,
            _query: &RecordQuery<'_>,
        ) -> Result<Option<AttestationRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn holder(id: &str) -> HolderId {
        HolderId::new(id).unwrap()
    }

    fn membership_query() -> SourceConfig {
        SourceConfig::Queryable(QueryConfig {
            table_name: "membership_attestations".into(),
            data_source_name: "membership".into(),
            id_column: "holder_id".into(),
            order_by: None,
        })
    }

    #[tokio::test]
    async fn static_source_ignores_holder() {
        let record = json!({"membership_type": "FullMember"})
            .as_object()
            .cloned()
            .unwrap();
        let source = source_for(
            &SourceConfig::Static {
                record: record.clone(),
            },
            &DataSources::new(),
        )
        .unwrap();
        assert_eq!(source.resolve(&holder("anyone")).await.unwrap(), record);
    }

    #[tokio::test]
    async fn queryable_source_resolves_and_reports_not_found() {
        let store = InMemoryRecordStore::new();
        store.insert(
            "membership_attestations",
            json!({"holder_id": "h1", "membership_type": "FullMember"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let sources = DataSources::new().with_source("membership", Arc::new(store));
        let source = source_for(&membership_query(), &sources).unwrap();

        let record = source.resolve(&holder("h1")).await.unwrap();
        assert_eq!(record["membership_type"], "FullMember");
        assert_eq!(
            source.resolve(&holder("h2")).await.unwrap_err(),
            SourceError::NotFound {
                holder: "h2".into()
            }
        );
    }

    #[tokio::test]
    async fn store_failure_is_unavailable_not_missing() {
        let sources = DataSources::new().with_source("membership", Arc::new(DownStore));
        let source = source_for(&membership_query(), &sources).unwrap();
        assert!(matches!(
            source.resolve(&holder("h1")).await,
            Err(SourceError::Unavailable(msg)) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn unknown_data_source_is_unavailable() {
        assert!(matches!(
            source_for(&membership_query(), &DataSources::new()),
            Err(SourceError::Unavailable(_))
        ));
    }
}
