//! Deterministic digest over the content sections of a full export.
//!
//! The digest covers exactly [`HASHED_FIELDS`]. Volatile metadata
//! (`generatedAt`), derived data (`counts`), and presentational fields
//! (`schema`, `version`) stay out, so re-stamping an unchanged snapshot at a
//! different time yields the same digest.
//!
//! Canonical form: object keys sorted, object members whose value is `null`
//! dropped (an absent optional and an explicit `null` hash the same), arrays
//! kept in the order given. The hasher never sorts arrays; callers feed
//! records in a stable order such as creation order.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest as _, Sha256};

use rzt_types::{Attachment, Color, ColorLink, Digest, Pattern, PatternLink, Settings, Tissue};

/// Payload members that feed the digest.
pub const HASHED_FIELDS: [&str; 7] = [
    "tissues",
    "colors",
    "patterns",
    "links",
    "patternLinks",
    "attachments",
    "settings",
];

/// The typed view of the hashed sections, borrowed from a payload under construction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashInput<'a> {
    pub tissues: &'a [Tissue],
    pub colors: &'a [Color],
    pub patterns: &'a [Pattern],
    pub links: &'a [ColorLink],
    pub pattern_links: &'a [PatternLink],
    pub attachments: &'a [Attachment],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<&'a Settings>,
}

/// SHA-256 digest over canonical JSON.
pub struct CanonicalHasher;

impl CanonicalHasher {
    /// Digest of the typed sections.
    pub fn hash(input: &HashInput<'_>) -> Result<Digest, HasherError> {
        let value =
            serde_json::to_value(input).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(Self::hash_value(&value))
    }

    /// Digest of a raw, already parsed payload.
    ///
    /// Only the [`HASHED_FIELDS`] members of `payload` are read; a payload
    /// that is not an object hashes as an empty section set.
    pub fn hash_payload_value(payload: &Value) -> Digest {
        let mut sections = Map::new();
        if let Some(object) = payload.as_object() {
            for field in HASHED_FIELDS {
                if let Some(section) = object.get(field) {
                    sections.insert(field.to_string(), section.clone());
                }
            }
        }
        Self::hash_value(&Value::Object(sections))
    }

    /// Digest of any JSON value in canonical form.
    pub fn hash_value(value: &Value) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(value).as_bytes());
        Digest::from_hash(hasher.finalize().into())
    }
}

/// Render `value` as canonical JSON text.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn color(id: &str, sku: &str) -> Color {
        Color {
            id: id.into(),
            name: format!("Cor {sku}"),
            hex: Some("#112233".into()),
            lab_l: None,
            lab_a: None,
            lab_b: None,
            sku: sku.into(),
            created_at: Some("2025-01-01T00:00:00.000Z".into()),
        }
    }

    fn input<'a>(colors: &'a [Color], settings: Option<&'a Settings>) -> HashInput<'a> {
        HashInput {
            tissues: &[],
            colors,
            patterns: &[],
            links: &[],
            pattern_links: &[],
            attachments: &[],
            settings,
        }
    }

    #[test]
    fn canonical_form_sorts_keys_and_drops_nulls() {
        let value = json!({"b": 1, "a": [true, null, {"z": null, "y": "x"}], "c": null});
        assert_eq!(canonical_json(&value), r#"{"a":[true,null,{"y":"x"}],"b":1}"#);
    }

    #[test]
    fn digest_is_64_lowercase_hex() {
        let hex = CanonicalHasher::hash_value(&json!({})).to_hex();
        assert!(Digest::is_valid_hex(&hex));
    }

    #[test]
    fn typed_and_raw_digests_agree() {
        let colors = vec![color("c1", "AZ001")];
        let settings = Settings {
            delta_threshold: Some(3.9),
            hue_boundaries: None,
        };
        let typed = CanonicalHasher::hash(&input(&colors, Some(&settings))).unwrap();

        let raw = json!({
            "schema": "razai-tools.full-export",
            "version": 4,
            "generatedAt": "2030-01-01T00:00:00Z",
            "counts": {"colors": 1},
            "tissues": [], "patterns": [], "links": [], "patternLinks": [], "attachments": [],
            "colors": serde_json::to_value(&colors).unwrap(),
            "settings": {"deltaThreshold": 3.9},
            "integrity": {"hashHex": "00"}
        });
        assert_eq!(CanonicalHasher::hash_payload_value(&raw), typed);
    }

    #[test]
    fn volatile_fields_do_not_affect_digest() {
        let a = json!({"colors": [], "generatedAt": "2025-01-01", "version": 4});
        let b = json!({"colors": [], "generatedAt": "2026-06-06", "version": 3, "counts": {}});
        assert_eq!(
            CanonicalHasher::hash_payload_value(&a),
            CanonicalHasher::hash_payload_value(&b)
        );
    }

    #[test]
    fn array_order_matters() {
        let first = vec![color("c1", "A"), color("c2", "B")];
        let swapped = vec![color("c2", "B"), color("c1", "A")];
        assert_ne!(
            CanonicalHasher::hash(&input(&first, None)).unwrap(),
            CanonicalHasher::hash(&input(&swapped, None)).unwrap()
        );
    }

    #[test]
    fn absent_and_null_settings_hash_alike() {
        let absent = json!({"colors": []});
        let null = json!({"colors": [], "settings": null});
        assert_eq!(
            CanonicalHasher::hash_payload_value(&absent),
            CanonicalHasher::hash_payload_value(&null)
        );
    }

    proptest! {
        #[test]
        fn digest_ignores_key_insertion_order(a in any::<i64>(), b in ".*", c in any::<bool>()) {
            let mut forward = Map::new();
            forward.insert("alpha".into(), json!(a));
            forward.insert("beta".into(), json!(b));
            forward.insert("gamma".into(), json!(c));
            let mut backward = Map::new();
            backward.insert("gamma".into(), json!(c));
            backward.insert("beta".into(), json!(b));
            backward.insert("alpha".into(), json!(a));
            prop_assert_eq!(
                CanonicalHasher::hash_value(&Value::Object(forward)),
                CanonicalHasher::hash_value(&Value::Object(backward))
            );
        }

        #[test]
        fn mutating_a_record_changes_digest(name in "[a-z]{1,12}", other in "[A-Z]{1,12}") {
            let original = vec![color("c1", &name)];
            let mutated = vec![color("c1", &other)];
            prop_assert_ne!(
                CanonicalHasher::hash(&input(&original, None)).unwrap(),
                CanonicalHasher::hash(&input(&mutated, None)).unwrap()
            );
        }
    }
}
