//! Versioned channel alias table.
//! Maps well-known channel names to concrete retailer ids and name fragments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const BUILTIN_ALIASES: &str = include_str!("../../data/channel_aliases.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Exact `retailer_id` values the alias stands for.
    #[serde(default)]
    pub retailer_ids: Vec<String>,
    /// Case-insensitive fragments of `retailer_name`.
    #[serde(default)]
    pub name_contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasTable {
    pub version: u32,
    /// Keys are stored lowercased.
    aliases: BTreeMap<String, AliasEntry>,
}

impl AliasTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_ALIASES)
    }

    /// Load a replacement table from disk.
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
            .map_err(|e| AppError::Config(format!("alias table {path}: {e}")))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: AliasTable = serde_json::from_str(raw)?;
        let aliases = parsed
            .aliases
            .into_iter()
            .map(|(name, entry)| (name.trim().to_lowercase(), entry))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Ok(Self {
            version: parsed.version,
            aliases,
        })
    }

    /// Case-insensitive lookup of a channel token.
    pub fn lookup(&self, token: &str) -> Option<&AliasEntry> {
        self.aliases.get(&token.trim().to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        let table = AliasTable::builtin().unwrap();
        assert!(table.version >= 1);
        assert!(!table.is_empty());
        let amazon = table.lookup("Amazon").expect("amazon alias");
        assert!(amazon.retailer_ids.contains(&"1".to_string()));
    }

    #[test]
    fn keys_are_normalized() {
        let table = AliasTable::from_json(
            r#"{"version": 3, "aliases": {"  Big Box ": {"name_contains": ["bigbox"]}}}"#,
        )
        .unwrap();
        assert_eq!(table.version, 3);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["big box"]);
        let entry = table.lookup("BIG BOX").unwrap();
        assert!(entry.retailer_ids.is_empty());
        assert_eq!(entry.name_contains, vec!["bigbox".to_string()]);
    }

    #[test]
    fn malformed_table_is_rejected() {
        assert!(AliasTable::from_json(r#"{"aliases": []}"#).is_err());
    }
}
