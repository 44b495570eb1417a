//! # Registration Model
//!
//! Holders, attestation definitions and credential definitions as the
//! administrator registers them. The serde representation is the admin wire
//! format, so the same types back HTTP bodies and YAML seed files:
//!
//! ```json
//! {"id": "membership", "attestationType": "database",
//!  "configuration": {"tableName": "membership_attestations",
//!                    "dataSourceName": "membership", "idColumn": "holder_id"}}
//! ```
//!
//! `validate()` checks everything that can be checked without looking at
//! other registrations; cross-record rules (uniqueness, referential
//! integrity) live in the registry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use issuer_core::{DefinitionId, Did, HolderId, IssuingContext, RequestId, Timestamp, ValidationError};
use issuer_state::IssuanceMode;
use issuer_vc::CredentialFormat;

/// Root of every mapping output path.
pub const CREDENTIAL_SUBJECT: &str = "credentialSubject";

const MAX_SQL_IDENTIFIER: usize = 63;
const MAX_NAME: usize = 256;

// ─── Holder ──────────────────────────────────────────────────────────

/// A participant that may receive credentials within an issuing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub holder_id: HolderId,
    pub did: Did,
    pub name: String,
}

impl Holder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.len() > MAX_NAME {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME,
                actual: name.len(),
            });
        }
        Ok(())
    }
}

// ─── Attestation Definition ──────────────────────────────────────────

/// Configuration of a queryable (`database`) attestation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Collection (table) to query.
    pub table_name: String,
    /// Name of the backing store registered with the engine.
    pub data_source_name: String,
    /// Column compared against the holder id.
    pub id_column: String,
    /// Column that orders multiple matches; the greatest value wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

/// Where an attestation's data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "attestationType", content = "configuration")]
pub enum SourceConfig {
    /// Returns the same record for every holder.
    #[serde(rename = "demo")]
    Static { record: Map<String, Value> },
    /// Equality lookup against a registered data source.
    #[serde(rename = "database")]
    Queryable(QueryConfig),
}

impl SourceConfig {
    /// Short kind name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Queryable(_) => "queryable",
        }
    }
}

/// How to obtain one kind of evidence about a holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationDefinition {
    pub id: DefinitionId,
    #[serde(flatten)]
    pub source: SourceConfig,
}

impl AttestationDefinition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.source {
            SourceConfig::Static { .. } => Ok(()),
            SourceConfig::Queryable(q) => {
                sql_identifier("tableName", &q.table_name)?;
                sql_identifier("idColumn", &q.id_column)?;
                if let Some(order_by) = &q.order_by {
                    sql_identifier("orderBy", order_by)?;
                }
                if q.data_source_name.trim().is_empty() {
                    return Err(ValidationError::Empty {
                        field: "dataSourceName",
                    });
                }
                Ok(())
            }
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 characters.
fn sql_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > MAX_SQL_IDENTIFIER {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_SQL_IDENTIFIER,
            actual: value.len(),
        });
    }
    let mut chars = value.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("{value:?} is not a plain SQL identifier"),
        });
    }
    Ok(())
}

// ─── Credential Definition ───────────────────────────────────────────

fn default_required() -> bool {
    true
}

/// One field copied from an attestation record into the claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Dotted path into the attestation record.
    #[serde(rename = "input")]
    pub input_path: String,
    /// Dotted path in the claim set, rooted at `credentialSubject`.
    #[serde(rename = "output")]
    pub output_path: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Attestation the input is read from; defaults to the first required one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DefinitionId>,
}

impl Mapping {
    pub fn new(input: impl Into<String>, output: impl Into<String>, required: bool) -> Self {
        Self {
            input_path: input.into(),
            output_path: output.into(),
            required,
            source: None,
        }
    }

    pub fn with_source(mut self, source: DefinitionId) -> Self {
        self.source = Some(source);
        self
    }
}

/// Template for one credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub id: DefinitionId,
    pub credential_type: String,
    #[serde(rename = "attestations")]
    pub required_attestation_ids: Vec<DefinitionId>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(rename = "validity")]
    pub validity_seconds: u64,
    #[serde(default)]
    pub format: CredentialFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema_url: Option<String>,
}

impl CredentialDefinition {
    /// The attestation a mapping reads from.
    pub fn source_of<'a>(&'a self, mapping: &'a Mapping) -> Option<&'a DefinitionId> {
        mapping
            .source
            .as_ref()
            .or_else(|| self.required_attestation_ids.first())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let ty = self.credential_type.trim();
        if ty.is_empty() {
            return Err(ValidationError::Empty {
                field: "credentialType",
            });
        }
        if !ty.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ValidationError::Invalid {
                field: "credentialType",
                reason: format!("{ty:?} is not a credential type name"),
            });
        }
        if self.validity_seconds == 0 {
            return Err(ValidationError::Invalid {
                field: "validity",
                reason: "must be at least one second".into(),
            });
        }
        if self.required_attestation_ids.is_empty() {
            return Err(ValidationError::Empty {
                field: "attestations",
            });
        }
        let mut seen = BTreeSet::new();
        for id in &self.required_attestation_ids {
            if !seen.insert(id) {
                return Err(ValidationError::Invalid {
                    field: "attestations",
                    reason: format!("{id} is listed twice"),
                });
            }
        }
        if let Some(alias) = &self.key_alias {
            if alias.trim().is_empty() {
                return Err(ValidationError::Empty { field: "keyAlias" });
            }
        }

        for mapping in &self.mappings {
            if !is_dotted_path(&mapping.input_path) {
                return Err(ValidationError::Invalid {
                    field: "mappings.input",
                    reason: format!("{:?} is not a dotted path", mapping.input_path),
                });
            }
            let rooted = mapping
                .output_path
                .strip_prefix(CREDENTIAL_SUBJECT)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));
            if !rooted || !is_dotted_path(&mapping.output_path) {
                return Err(ValidationError::Invalid {
                    field: "mappings.output",
                    reason: format!(
                        "{:?} must be a dotted path under {CREDENTIAL_SUBJECT}",
                        mapping.output_path
                    ),
                });
            }
            if let Some(source) = &mapping.source {
                if !self.required_attestation_ids.contains(source) {
                    return Err(ValidationError::Invalid {
                        field: "mappings.source",
                        reason: format!("{source} is not one of the required attestations"),
                    });
                }
            }
        }

        // A path may not be written twice, nor be a prefix of another path.
        let outputs: Vec<&str> = self.mappings.iter().map(|m| m.output_path.as_str()).collect();
        for (i, a) in outputs.iter().enumerate() {
            for b in &outputs[i + 1..] {
                if a == b || is_path_prefix(a, b) || is_path_prefix(b, a) {
                    return Err(ValidationError::Invalid {
                        field: "mappings.output",
                        reason: format!("{a:?} and {b:?} overlap"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn is_dotted_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| !segment.is_empty())
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.'))
}

// ─── Issuance Request ────────────────────────────────────────────────

/// What a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceSubmission {
    pub context: IssuingContext,
    pub holder_id: HolderId,
    pub issuer: Did,
    pub definition_ids: Vec<DefinitionId>,
    /// Falls back to the engine default when absent.
    pub mode: Option<IssuanceMode>,
}

/// An accepted issuance request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    pub id: RequestId,
    pub issuing_context: IssuingContext,
    pub holder_id: HolderId,
    pub issuer_id: Did,
    pub credential_definition_ids: Vec<DefinitionId>,
    pub mode: IssuanceMode,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def_id(s: &str) -> DefinitionId {
        DefinitionId::new(s).unwrap()
    }

    fn membership_definition() -> CredentialDefinition {
        CredentialDefinition {
            id: def_id("membership-cred"),
            credential_type: "MembershipCredential".into(),
            required_attestation_ids: vec![def_id("membership")],
            mappings: vec![
                Mapping::new("membership_type", "credentialSubject.membershipType", true),
                Mapping::new(
                    "membership_start_date",
                    "credentialSubject.membershipStartDate",
                    true,
                ),
            ],
            validity_seconds: 86_400,
            format: CredentialFormat::Vc10Jwt,
            key_alias: None,
            json_schema_url: None,
        }
    }

    #[test]
    fn attestation_wire_format() {
        let def: AttestationDefinition = serde_json::from_value(json!({
            "id": "membership-attestation-db",
            "attestationType": "database",
            "configuration": {
                "tableName": "membership_attestations",
                "dataSourceName": "membership",
                "idColumn": "holder_id"
            }
        }))
        .unwrap();
        assert_eq!(def.source.kind(), "queryable");
        def.validate().unwrap();

        let demo: AttestationDefinition = serde_json::from_value(json!({
            "id": "demo",
            "attestationType": "demo",
            "configuration": {"record": {"membership_type": "FullMember"}}
        }))
        .unwrap();
        assert_eq!(demo.source.kind(), "static");
        let back = serde_json::to_value(&demo).unwrap();
        assert_eq!(back["attestationType"], "demo");
    }

    #[test]
    fn sql_identifiers_are_enforced() {
        let def = AttestationDefinition {
            id: def_id("m"),
            source: SourceConfig::Queryable(QueryConfig {
                table_name: "members; DROP TABLE holders".into(),
                data_source_name: "membership".into(),
                id_column: "holder_id".into(),
                order_by: None,
            }),
        };
        assert!(matches!(
            def.validate(),
            Err(ValidationError::Invalid { field: "tableName", .. })
        ));
        assert!(sql_identifier("x", "_ok_9").is_ok());
        assert!(sql_identifier("x", "9bad").is_err());
        assert!(sql_identifier("x", &"a".repeat(64)).is_err());
    }

    #[test]
    fn credential_wire_format() {
        let def: CredentialDefinition = serde_json::from_value(json!({
            "id": "membership-credential-def",
            "credentialType": "MembershipCredential",
            "attestations": ["membership-attestation-db"],
            "jsonSchema": "{}",
            "jsonSchemaUrl": "https://example.com/schema/membershipcredential.json",
            "mappings": [
                {"input": "membership_type", "output": "credentialSubject.membershipType", "required": true},
                {"input": "holder_id", "output": "credentialSubject.id"}
            ],
            "rules": [],
            "validity": 604800,
            "format": "VC1_0_JWT"
        }))
        .unwrap();
        assert_eq!(def.validity_seconds, 604_800);
        assert!(def.mappings[1].required);
        def.validate().unwrap();
    }

    #[test]
    fn validity_and_attestations_are_required() {
        let mut def = membership_definition();
        def.validity_seconds = 0;
        assert!(def.validate().is_err());

        let mut def = membership_definition();
        def.required_attestation_ids.clear();
        assert!(def.validate().is_err());

        let mut def = membership_definition();
        def.required_attestation_ids.push(def_id("membership"));
        assert!(def.validate().is_err());
    }

    #[test]
    fn output_paths_must_be_rooted_and_disjoint() {
        let mut def = membership_definition();
        def.mappings.push(Mapping::new("x", "evidence.x", false));
        assert!(def.validate().is_err());

        let mut def = membership_definition();
        def.mappings
            .push(Mapping::new("x", "credentialSubjectX.y", false));
        assert!(def.validate().is_err());

        let mut def = membership_definition();
        def.mappings.push(Mapping::new(
            "x",
            "credentialSubject.membershipType.detail",
            false,
        ));
        assert!(def.validate().is_err());

        let mut def = membership_definition();
        def.mappings
            .push(Mapping::new("x", "credentialSubject.membershipType", false));
        assert!(def.validate().is_err());
    }

    #[test]
    fn mapping_source_must_be_required() {
        let mut def = membership_definition();
        def.mappings
            .push(Mapping::new("level", "credentialSubject.level", true).with_source(def_id("other")));
        assert!(matches!(
            def.validate(),
            Err(ValidationError::Invalid { field: "mappings.source", .. })
        ));
    }

    #[test]
    fn source_defaults_to_first_required_attestation() {
        let def = membership_definition();
        assert_eq!(def.source_of(&def.mappings[0]), Some(&def_id("membership")));
    }

    #[test]
    fn holder_name_must_not_be_blank() {
        let holder = Holder {
            holder_id: HolderId::new("h1").unwrap(),
            did: Did::new("did:web:example:consumer").unwrap(),
            name: "  ".into(),
        };
        assert_eq!(holder.validate(), Err(ValidationError::Empty { field: "name" }));
    }
}
