//! Athlete identity canonicalization
//!
//! Known misspellings of an athlete's name are mapped to a single canonical
//! identity before any grouping, so one athlete never splits into two rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping of misspelled identity -> canonical identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias; both sides are trimmed
    pub fn insert(&mut self, alias: impl AsRef<str>, canonical: impl AsRef<str>) {
        self.aliases.insert(
            alias.as_ref().trim().to_string(),
            canonical.as_ref().trim().to_string(),
        );
    }

    /// Parse an `OLD=NEW` pair as given on the command line
    pub fn parse_pair(pair: &str) -> Option<(String, String)> {
        let (alias, canonical) = pair.split_once('=')?;
        let alias = alias.trim();
        let canonical = canonical.trim();
        if alias.is_empty() || canonical.is_empty() {
            return None;
        }
        Some((alias.to_string(), canonical.to_string()))
    }

    /// Canonical form of a trimmed identity.
    ///
    /// Aliases are resolved once; chains (a -> b -> c) are not followed.
    pub fn canonicalize(&self, identity: &str) -> String {
        let trimmed = identity.trim();
        match self.aliases.get(trimmed) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }

    /// Aliases whose canonical identity is blank
    pub fn blank_targets(&self) -> impl Iterator<Item = &str> + '_ {
        self.aliases
            .iter()
            .filter(|(_, canonical)| canonical.is_empty())
            .map(|(alias, _)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn extend(&mut self, other: &AliasTable) {
        for (alias, canonical) in &other.aliases {
            self.aliases.insert(alias.clone(), canonical.clone());
        }
    }
}

impl<A: AsRef<str>, C: AsRef<str>> FromIterator<(A, C)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        let mut table = AliasTable::new();
        for (alias, canonical) in iter {
            table.insert(alias, canonical);
        }
        table
    }
}
