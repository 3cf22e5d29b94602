use std::fmt;

use serde::{Deserialize, Serialize};

/// The five entity collections carried by a full export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Tissues,
    Colors,
    Patterns,
    Links,
    PatternLinks,
}

impl EntityKind {
    /// Import order: independent kinds first, then the kinds that reference them.
    pub const DEPENDENCY_ORDER: [EntityKind; 5] = [
        EntityKind::Tissues,
        EntityKind::Colors,
        EntityKind::Patterns,
        EntityKind::Links,
        EntityKind::PatternLinks,
    ];

    /// The payload field name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tissues => "tissues",
            Self::Colors => "colors",
            Self::Patterns => "patterns",
            Self::Links => "links",
            Self::PatternLinks => "patternLinks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A count per entity kind (used for `inserted` and `updated` tallies).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    pub tissues: u64,
    pub colors: u64,
    pub patterns: u64,
    pub links: u64,
    pub pattern_links: u64,
}

impl KindCounts {
    pub fn get(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Tissues => self.tissues,
            EntityKind::Colors => self.colors,
            EntityKind::Patterns => self.patterns,
            EntityKind::Links => self.links,
            EntityKind::PatternLinks => self.pattern_links,
        }
    }

    pub fn increment(&mut self, kind: EntityKind) {
        let slot = match kind {
            EntityKind::Tissues => &mut self.tissues,
            EntityKind::Colors => &mut self.colors,
            EntityKind::Patterns => &mut self.patterns,
            EntityKind::Links => &mut self.links,
            EntityKind::PatternLinks => &mut self.pattern_links,
        };
        *slot += 1;
    }

    /// Sum across all kinds.
    pub fn total(&self) -> u64 {
        EntityKind::DEPENDENCY_ORDER
            .iter()
            .map(|kind| self.get(*kind))
            .sum()
    }
}
