//! # Definition Registries
//!
//! Holders, attestation definitions and credential definitions, each keyed
//! by `(issuing context, id)`. The three maps sit behind one
//! `parking_lot::RwLock`: the referential-integrity checks (a credential
//! definition's attestations exist on create, an attestation is
//! unreferenced on delete) run under the same write lock as the mutation
//! they guard.
//!
//! There is no update operation. Changing a definition means registering a
//! new id.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use thiserror::Error;

use issuer_core::{DefinitionId, HolderId, IssuingContext, ValidationError};

use crate::model::{AttestationDefinition, CredentialDefinition, Holder};

/// Which registry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Holder,
    AttestationDefinition,
    CredentialDefinition,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Holder => "holder",
            Self::AttestationDefinition => "attestation definition",
            Self::CredentialDefinition => "credential definition",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already registered in this context.
    #[error("{kind} {id} already exists in context {context}")]
    Conflict {
        kind: RecordKind,
        context: String,
        id: String,
    },

    #[error("{kind} {id} not found in context {context}")]
    NotFound {
        kind: RecordKind,
        context: String,
        id: String,
    },

    /// A credential definition names attestations that are not registered.
    #[error("unknown attestation definition(s) in context {context}: {}", .ids.join(", "))]
    UnknownAttestation { context: String, ids: Vec<String> },

    /// An attestation definition is still used by credential definitions.
    #[error("attestation definition {id} is referenced by {}", .referenced_by.join(", "))]
    ReferencedAttestation {
        id: String,
        referenced_by: Vec<String>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

type Key<I> = (IssuingContext, I);

#[derive(Debug, Default)]
struct Inner {
    holders: BTreeMap<Key<HolderId>, Holder>,
    attestations: BTreeMap<Key<DefinitionId>, AttestationDefinition>,
    credentials: BTreeMap<Key<DefinitionId>, CredentialDefinition>,
}

/// A credential definition together with the attestation definitions it
/// requires, captured atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefinition {
    pub definition: CredentialDefinition,
    pub attestations: BTreeMap<DefinitionId, AttestationDefinition>,
}

/// Registries for every issuing context.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

fn key<I: Clone>(context: &IssuingContext, id: &I) -> Key<I> {
    (context.clone(), id.clone())
}

fn conflict(kind: RecordKind, context: &IssuingContext, id: impl ToString) -> RegistryError {
    RegistryError::Conflict {
        kind,
        context: context.to_string(),
        id: id.to_string(),
    }
}

fn not_found(kind: RecordKind, context: &IssuingContext, id: impl ToString) -> RegistryError {
    RegistryError::NotFound {
        kind,
        context: context.to_string(),
        id: id.to_string(),
    }
}

fn in_context<'a, I, V>(
    map: &'a BTreeMap<Key<I>, V>,
    context: &'a IssuingContext,
) -> impl Iterator<Item = &'a V> + 'a {
    map.iter()
        .filter(move |((ctx, _), _)| ctx == context)
        .map(|(_, v)| v)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Holders ─────────────────────────────────────────────────────

    pub fn create_holder(
        &self,
        context: &IssuingContext,
        holder: Holder,
    ) -> Result<(), RegistryError> {
        holder.validate()?;
        let mut inner = self.inner.write();
        let k = key(context, &holder.holder_id);
        if inner.holders.contains_key(&k) {
            return Err(conflict(RecordKind::Holder, context, &holder.holder_id));
        }
        inner.holders.insert(k, holder);
        Ok(())
    }

    pub fn holder(&self, context: &IssuingContext, id: &HolderId) -> Result<Holder, RegistryError> {
        self.inner
            .read()
            .holders
            .get(&key(context, id))
            .cloned()
            .ok_or_else(|| not_found(RecordKind::Holder, context, id))
    }

    /// Holders of a context, ordered by id.
    pub fn holders(&self, context: &IssuingContext) -> Vec<Holder> {
        in_context(&self.inner.read().holders, context)
            .cloned()
            .collect()
    }

    pub fn delete_holder(&self, context: &IssuingContext, id: &HolderId) -> Result<(), RegistryError> {
        self.inner
            .write()
            .holders
            .remove(&key(context, id))
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::Holder, context, id))
    }

    // ─── Attestation definitions ─────────────────────────────────────

    pub fn create_attestation_definition(
        &self,
        context: &IssuingContext,
        definition: AttestationDefinition,
    ) -> Result<(), RegistryError> {
        definition.validate()?;
        let mut inner = self.inner.write();
        let k = key(context, &definition.id);
        if inner.attestations.contains_key(&k) {
            return Err(conflict(
                RecordKind::AttestationDefinition,
                context,
                &definition.id,
            ));
        }
        inner.attestations.insert(k, definition);
        Ok(())
    }

    pub fn attestation_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<AttestationDefinition, RegistryError> {
        self.inner
            .read()
            .attestations
            .get(&key(context, id))
            .cloned()
            .ok_or_else(|| not_found(RecordKind::AttestationDefinition, context, id))
    }

    pub fn attestation_definitions(&self, context: &IssuingContext) -> Vec<AttestationDefinition> {
        in_context(&self.inner.read().attestations, context)
            .cloned()
            .collect()
    }

    /// Delete an attestation definition no credential definition references.
    pub fn delete_attestation_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let k = key(context, id);
        if !inner.attestations.contains_key(&k) {
            return Err(not_found(RecordKind::AttestationDefinition, context, id));
        }
        let referenced_by: Vec<String> = in_context(&inner.credentials, context)
            .filter(|c| c.required_attestation_ids.contains(id))
            .map(|c| c.id.to_string())
            .collect();
        if !referenced_by.is_empty() {
            return Err(RegistryError::ReferencedAttestation {
                id: id.to_string(),
                referenced_by,
            });
        }
        inner.attestations.remove(&k);
        Ok(())
    }

    // ─── Credential definitions ──────────────────────────────────────

    pub fn create_credential_definition(
        &self,
        context: &IssuingContext,
        definition: CredentialDefinition,
    ) -> Result<(), RegistryError> {
        definition.validate()?;
        let mut inner = self.inner.write();
        let k = key(context, &definition.id);
        if inner.credentials.contains_key(&k) {
            return Err(conflict(
                RecordKind::CredentialDefinition,
                context,
                &definition.id,
            ));
        }
        let missing: Vec<String> = definition
            .required_attestation_ids
            .iter()
            .filter(|id| !inner.attestations.contains_key(&key(context, *id)))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::UnknownAttestation {
                context: context.to_string(),
                ids: missing,
            });
        }
        inner.credentials.insert(k, definition);
        Ok(())
    }

    pub fn credential_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<CredentialDefinition, RegistryError> {
        self.inner
            .read()
            .credentials
            .get(&key(context, id))
            .cloned()
            .ok_or_else(|| not_found(RecordKind::CredentialDefinition, context, id))
    }

    pub fn credential_definitions(&self, context: &IssuingContext) -> Vec<CredentialDefinition> {
        in_context(&self.inner.read().credentials, context)
            .cloned()
            .collect()
    }

    pub fn delete_credential_definition(
        &self,
        context: &IssuingContext,
        id: &DefinitionId,
    ) -> Result<(), RegistryError> {
        self.inner
            .write()
            .credentials
            .remove(&key(context, id))
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::CredentialDefinition, context, id))
    }

    // ─── Snapshots ───────────────────────────────────────────────────

    /// Resolve credential definitions and their attestations under one
    /// read lock. Unknown ids map to `None`, in request order.
    pub fn resolve(
        &self,
        context: &IssuingContext,
        ids: &[DefinitionId],
    ) -> Vec<Option<ResolvedDefinition>> {
        let inner = self.inner.read();
        ids.iter()
            .map(|id| {
                let definition = inner.credentials.get(&key(context, id))?.clone();
                let attestations = definition
                    .required_attestation_ids
                    .iter()
                    .filter_map(|a| {
                        inner
                            .attestations
                            .get(&key(context, a))
                            .map(|def| (a.clone(), def.clone()))
                    })
                    .collect();
                Some(ResolvedDefinition {
                    definition,
                    attestations,
                })
            })
            .collect()
    }
}
