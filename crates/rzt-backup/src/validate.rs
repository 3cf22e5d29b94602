use serde_json::Value;

use rzt_types::{Digest, CURRENT_VERSION, SCHEMA};

use crate::error::{BackupError, BackupResult};
use crate::issue::ImportIssue;

const SECTIONS: [&str; 6] = [
    "tissues",
    "colors",
    "patterns",
    "links",
    "patternLinks",
    "attachments",
];

/// Shape problems of a parsed payload measured against the current format.
pub fn shape_issues(root: &Value) -> Vec<ImportIssue> {
    let Some(object) = root.as_object() else {
        return vec![ImportIssue::validation("payload root is not an object")];
    };

    let mut issues = Vec::new();
    if object.get("schema").and_then(Value::as_str) != Some(SCHEMA) {
        issues.push(ImportIssue::validation("schema missing or unrecognized"));
    }
    match object.get("version") {
        Some(v) if v.as_u64() == Some(u64::from(CURRENT_VERSION)) => {}
        Some(v) => issues.push(ImportIssue::version(format!(
            "expected version {CURRENT_VERSION}, found {v}"
        ))),
        None => issues.push(ImportIssue::version(format!(
            "expected version {CURRENT_VERSION}, found none"
        ))),
    }
    for section in SECTIONS {
        if !object.get(section).is_some_and(Value::is_array) {
            issues.push(ImportIssue::validation(format!(
                "{section} missing or not an array"
            )));
        }
    }
    let stamped = object
        .get("integrity")
        .and_then(|integrity| integrity.get("hashHex"))
        .and_then(Value::as_str)
        .is_some_and(Digest::is_valid_hex);
    if !stamped {
        issues.push(ImportIssue::validation("integrity.hashHex missing or malformed"));
    }
    issues
}

/// Dry run: parse and shape-check raw text without touching any store.
pub fn validate_payload_shape(raw: &str) -> BackupResult<Vec<ImportIssue>> {
    let root: Value = serde_json::from_str(raw).map_err(|e| BackupError::Parse(e.to_string()))?;
    Ok(shape_issues(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_payload_has_no_issues() {
        let root = json!({
            "schema": SCHEMA, "version": 4,
            "tissues": [], "colors": [], "patterns": [], "links": [],
            "patternLinks": [], "attachments": [],
            "integrity": { "hashAlgorithm": "SHA-256", "hashHex": "0f".repeat(32) }
        });
        assert!(shape_issues(&root).is_empty());
    }

    #[test]
    fn legacy_payload_lists_every_gap() {
        let issues = validate_payload_shape(
            r#"{"schema":"razai-tools.full-export","version":3,"tissues":[],"colors":[],"links":[]}"#,
        )
        .unwrap();
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "expected version 4, found 3",
                "patterns missing or not an array",
                "patternLinks missing or not an array",
                "attachments missing or not an array",
                "integrity.hashHex missing or malformed",
            ]
        );
    }

    #[test]
    fn unparsable_text_is_an_error() {
        assert!(matches!(validate_payload_shape("nope"), Err(BackupError::Parse(_))));
    }

    #[test]
    fn non_object_root() {
        assert_eq!(shape_issues(&json!([1, 2])).len(), 1);
    }
}
