use std::fmt;

use serde::{Deserialize, Serialize};

use rzt_types::KindCounts;

/// Category of a non-fatal import problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// The payload is older than current, newer than supported, or lacks a
    /// section its version should carry.
    Version,
    /// A record or section failed shape or content checks and was skipped.
    Validation,
    /// The datastore refused a write for a single record.
    Store,
}

/// A reported, non-fatal problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ImportIssue {
    pub fn version(message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Version,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Validation,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Store,
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one exact import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub inserted: KindCounts,
    pub updated: KindCounts,
    pub issues: Vec<ImportIssue>,
}

impl ImportResult {
    pub fn issue_messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub(crate) fn push(&mut self, issue: ImportIssue) {
        tracing::warn!(kind = ?issue.kind, "{}", issue.message);
        self.issues.push(issue);
    }
}
