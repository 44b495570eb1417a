//! # issuer-engine — Attestation-Driven Credential Issuance
//!
//! An administrator registers, per issuing context, how to obtain evidence
//! about a holder (attestation definitions) and how to turn that evidence
//! into a credential (credential definitions). A caller then asks for one
//! or more credentials for a holder; the engine answers with a request id
//! at once and does the work in the background:
//!
//! ```text
//! request_issuance ──▶ registry snapshot ──▶ PENDING
//!                                              │
//!        attestation sources ──▶ mapping ──▶ signer
//!                                              │
//!                                   ISSUED / FAILED (+ reason)
//! ```
//!
//! ## Modules
//!
//! - [`model`]: holders, attestation and credential definitions, requests.
//! - [`registry`]: per-context registries with referential integrity.
//! - [`source`], [`lookup`]: static and queryable attestation sources and
//!   their backing record stores.
//! - [`mapping`]: the pure attestation-to-claims mapping engine.
//! - [`orchestrator`], [`status`]: background processing and the status
//!   store pollers read from.
//! - [`engine`]: the [`IssuerEngine`] facade.
//! - [`seed`]: YAML seed files.

pub mod config;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod mapping;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod seed;
pub mod source;
pub mod status;
pub mod store;

pub use config::EngineConfig;
pub use engine::IssuerEngine;
pub use error::EngineError;
pub use lookup::{DataSources, InMemoryRecordStore, RecordLookup, RecordQuery, StoreError};
pub use mapping::{Claims, MappingError};
pub use model::{
    AttestationDefinition, CredentialDefinition, Holder, IssuanceRequest, IssuanceSubmission,
    Mapping, QueryConfig, SourceConfig, CREDENTIAL_SUBJECT,
};
pub use orchestrator::Orchestrator;
pub use registry::{RecordKind, Registry, RegistryError, ResolvedDefinition};
pub use seed::{Seed, SeedError, SeedSummary};
pub use source::{AttestationRecord, AttestationSource, QueryableSource, SourceError, StaticSource};
pub use status::{
    IssuanceRecord, IssuanceStatus, IssuanceStore, IssuedCredential, PurgeSummary, StatusError,
    SubRequest, SubRequestFailure, SubRequestStatus,
};
