//! # Mapping Engine
//!
//! Turns resolved attestation records into the claim set of a credential.
//! Pure and deterministic: the same mappings and records always produce
//! the same claims, and nothing here performs I/O.
//!
//! Each mapping reads its input path from exactly one record, the one of
//! its source attestation (explicit `source`, else the first required
//! attestation). Records are never searched for a field.
//!
//! A JSON `null` counts as absent. An absent required field fails the whole
//! mapping; no partial claim set is ever returned.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use issuer_core::DefinitionId;

use crate::model::Mapping;
use crate::source::AttestationRecord;

/// The claim tree handed to the signing boundary.
pub type Claims = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// A required input path resolved to nothing.
    #[error("required field {field} missing from attestation {attestation}")]
    MissingField { field: String, attestation: String },

    /// No record was supplied for the mapping's source attestation.
    #[error("no record for attestation {attestation}")]
    MissingRecord { attestation: String },

    /// The mapping has no explicit source and there are no required attestations.
    #[error("mapping for {field} has no source attestation")]
    NoSource { field: String },

    /// Two mappings write the same output location.
    #[error("output path {path} collides with another mapping")]
    OutputConflict { path: String },
}

/// Apply `mappings` to `records`.
pub fn apply(
    mappings: &[Mapping],
    required: &[DefinitionId],
    records: &BTreeMap<DefinitionId, AttestationRecord>,
) -> Result<Claims, MappingError> {
    let mut claims = Claims::new();
    for mapping in mappings {
        let source = mapping
            .source
            .as_ref()
            .or_else(|| required.first())
            .ok_or_else(|| MappingError::NoSource {
                field: mapping.input_path.clone(),
            })?;
        let record = records
            .get(source)
            .ok_or_else(|| MappingError::MissingRecord {
                attestation: source.to_string(),
            })?;

        match lookup_path(record, &mapping.input_path) {
            Some(value) => insert_path(&mut claims, &mapping.output_path, value.clone())?,
            None if mapping.required => {
                return Err(MappingError::MissingField {
                    field: mapping.input_path.clone(),
                    attestation: source.to_string(),
                })
            }
            None => {}
        }
    }
    Ok(claims)
}

/// Resolve a dotted path through nested objects. `null` resolves to `None`.
pub fn lookup_path<'a>(record: &'a AttestationRecord, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

fn insert_path(root: &mut Claims, path: &str, value: Value) -> Result<(), MappingError> {
    let conflict = || MappingError::OutputConflict {
        path: path.to_string(),
    };
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(conflict());
    };

    let mut node = root;
    for segment in parents {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        node = entry.as_object_mut().ok_or_else(conflict)?;
    }
    if node.contains_key(*last) {
        return Err(conflict());
    }
    node.insert(last.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn id(s: &str) -> DefinitionId {
        DefinitionId::new(s).unwrap()
    }

    fn record(v: Value) -> AttestationRecord {
        v.as_object().cloned().unwrap()
    }

    fn records(pairs: &[(&str, Value)]) -> BTreeMap<DefinitionId, AttestationRecord> {
        pairs
            .iter()
            .map(|(k, v)| (id(k), record(v.clone())))
            .collect()
    }

    #[test]
    fn copies_fields_into_nested_output() {
        let mappings = vec![
            Mapping::new("membership_type", "credentialSubject.membershipType", true),
            Mapping::new("profile.country", "credentialSubject.address.country", true),
        ];
        let recs = records(&[(
            "membership",
            json!({"membership_type": "FullMember", "profile": {"country": "DE"}}),
        )]);
        let claims = apply(&mappings, &[id("membership")], &recs).unwrap();
        assert_eq!(
            Value::Object(claims),
            json!({"credentialSubject": {
                "membershipType": "FullMember",
                "address": {"country": "DE"}
            }})
        );
    }

    #[test]
    fn values_pass_through_unchanged() {
        let mappings = vec![
            Mapping::new("n", "credentialSubject.n", true),
            Mapping::new("flags", "credentialSubject.flags", true),
        ];
        let recs = records(&[("a", json!({"n": 3, "flags": [true, false]}))]);
        let claims = apply(&mappings, &[id("a")], &recs).unwrap();
        assert_eq!(claims["credentialSubject"]["n"], json!(3));
        assert_eq!(claims["credentialSubject"]["flags"], json!([true, false]));
    }

    #[test]
    fn missing_required_field_fails_without_partial_claims() {
        let mappings = vec![
            Mapping::new("membership_start_date", "credentialSubject.since", true),
            Mapping::new("membership_type", "credentialSubject.membershipType", true),
        ];
        let recs = records(&[("membership", json!({"membership_start_date": "2023-01-01"}))]);
        assert_eq!(
            apply(&mappings, &[id("membership")], &recs),
            Err(MappingError::MissingField {
                field: "membership_type".into(),
                attestation: "membership".into()
            })
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let recs = records(&[("a", json!({"x": null}))]);
        let optional = vec![Mapping::new("x", "credentialSubject.x", false)];
        assert!(apply(&optional, &[id("a")], &recs).unwrap().is_empty());

        let required = vec![Mapping::new("x", "credentialSubject.x", true)];
        assert!(matches!(
            apply(&required, &[id("a")], &recs),
            Err(MappingError::MissingField { .. })
        ));
    }

    #[test]
    fn mapping_reads_only_its_source_record() {
        let recs = records(&[
            ("membership", json!({"holder_id": "h1"})),
            ("processor", json!({"processing_level": "processing"})),
        ]);
        let wrong_source = vec![Mapping::new("processing_level", "credentialSubject.level", true)];
        assert!(apply(&wrong_source, &[id("membership"), id("processor")], &recs).is_err());

        let explicit = vec![Mapping::new("processing_level", "credentialSubject.level", true)
            .with_source(id("processor"))];
        let claims = apply(&explicit, &[id("membership"), id("processor")], &recs).unwrap();
        assert_eq!(claims["credentialSubject"]["level"], "processing");
    }

    #[test]
    fn missing_record_is_reported() {
        let mappings = vec![Mapping::new("x", "credentialSubject.x", false)];
        assert_eq!(
            apply(&mappings, &[id("a")], &BTreeMap::new()),
            Err(MappingError::MissingRecord {
                attestation: "a".into()
            })
        );
    }

    #[test]
    fn colliding_outputs_are_rejected() {
        let mappings = vec![
            Mapping::new("a", "credentialSubject.x", true),
            Mapping::new("b", "credentialSubject.x.y", true),
        ];
        let recs = records(&[("r", json!({"a": 1, "b": 2}))]);
        assert!(matches!(
            apply(&mappings, &[id("r")], &recs),
            Err(MappingError::OutputConflict { .. })
        ));
    }

    #[test]
    fn lookup_path_walks_objects_only() {
        let rec = record(json!({"a": {"b": [1, 2]}, "s": "text"}));
        assert_eq!(lookup_path(&rec, "a.b"), Some(&json!([1, 2])));
        assert_eq!(lookup_path(&rec, "s.len"), None);
        assert_eq!(lookup_path(&rec, "a.b.0"), None);
    }

    fn field_name() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{0,8}"
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,12}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn mapping_is_deterministic(
            fields in proptest::collection::btree_map(field_name(), scalar(), 0..8),
            wanted in proptest::collection::btree_set(field_name(), 0..8),
            required in any::<bool>(),
        ) {
            let recs: BTreeMap<DefinitionId, AttestationRecord> =
                [(id("src"), fields.clone().into_iter().collect())].into_iter().collect();
            let mappings: Vec<Mapping> = wanted
                .iter()
                .map(|f| Mapping::new(f.clone(), format!("credentialSubject.{f}"), required))
                .collect();

            let first = apply(&mappings, &[id("src")], &recs);
            let second = apply(&mappings, &[id("src")], &recs);
            prop_assert_eq!(&first, &second);

            let any_missing = wanted
                .iter()
                .any(|f| fields.get(f).map_or(true, Value::is_null));
            if required && any_missing {
                prop_assert!(
                    matches!(first, Err(MappingError::MissingField { .. })),
                    "expected MissingField error, got {:?}",
                    first
                );
            } else {
                let claims = first.unwrap();
                let subject = claims
                    .get("credentialSubject")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                for f in &wanted {
                    match fields.get(f) {
                        Some(v) if !v.is_null() => prop_assert_eq!(subject.get(f), Some(v)),
                        _ => prop_assert!(subject.get(f).is_none()),
                    }
                }
            }
        }
    }
}
