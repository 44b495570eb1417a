//! # Seed Files
//!
//! Declarative YAML that registers holders, attestation definitions and
//! credential definitions per issuing context, plus optional attestation
//! rows for the in-memory record store:
//!
//! ```yaml
//! contexts:
//!   ctx-1:
//!     holders:
//!       - holderId: holder-1
//!         did: did:web:holder1.example
//!         name: Holder One
//!     attestations:
//!       - id: membership
//!         attestationType: database
//!         configuration:
//!           tableName: membership_attestations
//!           dataSourceName: membership
//!           idColumn: holder_id
//!     credentialDefinitions:
//!       - id: membership-cred
//!         credentialType: MembershipCredential
//!         attestations: [membership]
//!         validity: 31536000
//!         mappings:
//!           - input: membership_type
//!             output: credentialSubject.membershipType
//! records:
//!   membership_attestations:
//!     - holder_id: holder-1
//!       membership_type: full
//! ```
//!
//! Within a context, attestations are registered before the credential
//! definitions that reference them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use issuer_core::IssuingContext;

use crate::engine::IssuerEngine;
use crate::error::EngineError;
use crate::lookup::InMemoryRecordStore;
use crate::model::{AttestationDefinition, CredentialDefinition, Holder};
use crate::source::AttestationRecord;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read seed file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("seeding {id} in context {context} failed: {source}")]
    Engine {
        context: String,
        id: String,
        #[source]
        source: EngineError,
    },
}

/// Registrations for one issuing context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContextSeed {
    #[serde(default)]
    pub holders: Vec<Holder>,
    #[serde(default)]
    pub attestations: Vec<AttestationDefinition>,
    #[serde(default)]
    pub credential_definitions: Vec<CredentialDefinition>,
}

/// A parsed seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    #[serde(default)]
    pub contexts: BTreeMap<IssuingContext, ContextSeed>,
    /// Attestation rows keyed by table name.
    #[serde(default)]
    pub records: BTreeMap<String, Vec<AttestationRecord>>,
}

/// Counts of what a seed registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub contexts: usize,
    pub holders: usize,
    pub attestations: usize,
    pub credential_definitions: usize,
}

impl Seed {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Copy the seed's rows into `store`. Returns the number of rows.
    pub fn load_records(&self, store: &InMemoryRecordStore) -> usize {
        self.records
            .iter()
            .map(|(table, rows)| {
                store.extend(table.clone(), rows.iter().cloned());
                rows.len()
            })
            .sum()
    }

    /// Register everything in the seed. Stops at the first failure;
    /// registrations made before it stay in place.
    pub fn apply(&self, engine: &IssuerEngine) -> Result<SeedSummary, SeedError> {
        let mut summary = SeedSummary::default();
        for (context, seed) in &self.contexts {
            for holder in &seed.holders {
                engine
                    .register_holder(context, holder.clone())
                    .map_err(engine_error(context, holder.holder_id.to_string()))?;
                summary.holders += 1;
            }
            for attestation in &seed.attestations {
                engine
                    .register_attestation_definition(context, attestation.clone())
                    .map_err(engine_error(context, attestation.id.to_string()))?;
                summary.attestations += 1;
            }
            for definition in &seed.credential_definitions {
                engine
                    .register_credential_definition(context, definition.clone())
                    .map_err(engine_error(context, definition.id.to_string()))?;
                summary.credential_definitions += 1;
            }
            summary.contexts += 1;
        }
        tracing::info!(
            contexts = summary.contexts,
            holders = summary.holders,
            attestations = summary.attestations,
            credential_definitions = summary.credential_definitions,
            "seed applied"
        );
        Ok(summary)
    }
}

fn engine_error(context: &IssuingContext, id: String) -> impl FnOnce(EngineError) -> SeedError {
    let context = context.to_string();
    move |source| SeedError::Engine {
        context,
        id,
        source,
    }
}
