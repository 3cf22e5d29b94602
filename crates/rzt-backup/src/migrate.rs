//! Format upgrades applied before import.
//!
//! Each step lifts a version N shape to N+1 by filling the sections that
//! generation introduced. The importer then only ever sees the current shape.

use serde_json::{Map, Value};

use rzt_types::{Digest, CURRENT_VERSION};

use crate::issue::ImportIssue;

type Step = fn(&mut Map<String, Value>);

/// `(from, step)`: `step` upgrades a version `from` shape to `from + 1`.
const STEPS: [(u64, Step); 4] = [
    (0, v0_to_v1),
    (1, v1_to_v2),
    (2, v2_to_v3),
    (3, v3_to_v4),
];

fn ensure_array(root: &mut Map<String, Value>, section: &str) {
    root.entry(section.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
}

fn v0_to_v1(root: &mut Map<String, Value>) {
    for section in ["tissues", "colors", "links"] {
        ensure_array(root, section);
    }
}

fn v1_to_v2(root: &mut Map<String, Value>) {
    if root.get("settings").is_some_and(Value::is_null) {
        root.remove("settings");
    }
}

fn v2_to_v3(root: &mut Map<String, Value>) {
    ensure_array(root, "patterns");
    ensure_array(root, "patternLinks");
}

fn v3_to_v4(root: &mut Map<String, Value>) {
    ensure_array(root, "attachments");
}

/// Sections a current payload must carry. Reported, never fatal.
fn current_section_issues(root: &Map<String, Value>, version: u64) -> Vec<ImportIssue> {
    let mut issues = Vec::new();
    if !root.get("attachments").is_some_and(Value::is_array) {
        issues.push(ImportIssue::version(format!(
            "version {version} payload has no attachments table; images resolve from inline data only"
        )));
    }
    let stamped = root
        .get("integrity")
        .and_then(|integrity| integrity.get("hashHex"))
        .and_then(Value::as_str)
        .is_some_and(Digest::is_valid_hex);
    if !stamped {
        issues.push(ImportIssue::version(format!(
            "version {version} payload has no valid integrity hash"
        )));
    }
    issues
}

/// Upgrade `root` in place to the current shape and report what was found.
///
/// Returns the source version (0 when absent or non-numeric) and the
/// version issues raised along the way.
pub(crate) fn upgrade(root: &mut Map<String, Value>) -> (u64, Vec<ImportIssue>) {
    let current = u64::from(CURRENT_VERSION);
    let declared = root.get("version").and_then(Value::as_u64);
    let from = declared.unwrap_or(0);

    let mut issues = Vec::new();
    match declared {
        None => issues.push(ImportIssue::version(
            "payload has no numeric version; importing it as a legacy export",
        )),
        Some(v) if v < current => issues.push(ImportIssue::version(format!(
            "legacy format version {v} has no attachments or integrity hash; re-export to upgrade it"
        ))),
        Some(v) if v > current => issues.push(ImportIssue::version(format!(
            "version {v} is newer than supported version {current}; importing known sections only"
        ))),
        Some(_) => {}
    }

    if from >= current {
        issues.extend(current_section_issues(root, from));
        if !root.get("attachments").is_some_and(Value::is_array) {
            root.insert("attachments".into(), Value::Array(Vec::new()));
        }
    } else {
        for (start, step) in STEPS {
            if start >= from {
                tracing::debug!(from = start, to = start + 1, "upgrading payload shape");
                step(root);
            }
        }
        root.insert("version".into(), Value::from(current));
    }
    (from, issues)
}
