//! Regex relation tables.
//!
//! Source configs carry lists of `"regex = value"` strings that map names
//! from the source's world (cluster names, host names, VLAN names) onto
//! inventory entities (sites, tenants, roles, VLAN groups). Patterns are
//! compiled once; lookups return the value of the first pattern that
//! matches, in declaration order.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelationsError {
    #[error("invalid regex relation: {0}. Should be of format: regex = value")]
    MalformedRelation(String),
    #[error("invalid regex: {pattern}, in relation: {relation}")]
    InvalidRegex { pattern: String, relation: String },
}

/// An ordered regex -> value lookup table.
#[derive(Debug, Clone, Default)]
pub struct RelationMap {
    entries: Vec<(Regex, String)>,
}

impl RelationMap {
    /// Compile a table from `"regex = value"` strings, preserving order.
    pub fn compile(relations: &[String]) -> Result<Self, RelationsError> {
        let mut entries = Vec::with_capacity(relations.len());
        for relation in relations {
            let (pattern, value) = split_relation(relation)?;
            let regex = Regex::new(&anchored(&pattern)).map_err(|_| {
                RelationsError::InvalidRegex {
                    pattern,
                    relation: relation.clone(),
                }
            })?;
            entries.push((regex, value));
        }
        Ok(Self { entries })
    }

    /// Value of the first pattern matching `input`, in declaration order.
    pub fn match_value(&self, input: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(regex, _)| regex.is_match(input))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a `"left = right"` relation into its trimmed halves.
fn split_relation(relation: &str) -> Result<(String, String), RelationsError> {
    match relation.split_once('=') {
        Some((left, right)) if !left.trim().is_empty() && !right.trim().is_empty() => {
            Ok((left.trim().to_string(), right.trim().to_string()))
        }
        _ => Err(RelationsError::MalformedRelation(relation.to_string())),
    }
}

/// Patterns match the whole input, as in the original relation tables.
fn anchored(pattern: &str) -> String {
    format!("^{pattern}$")
}

/// Parse plain (non-regex) `"key = value"` pairs, e.g. custom field
/// mappings. Order is preserved.
pub fn string_pairs(pairs: &[String]) -> Result<Vec<(String, String)>, RelationsError> {
    pairs.iter().map(|p| split_relation(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[&str]) -> RelationMap {
        let owned: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        RelationMap::compile(&owned).unwrap()
    }

    #[test]
    fn first_match_wins() {
        let map = table(&[
            ".*Stark = Stark Industries",
            ".* = Default",
        ]);
        assert_eq!(map.match_value("Cluster_Stark"), Some("Stark Industries"));
        assert_eq!(map.match_value("Anything"), Some("Default"));
    }

    #[test]
    fn declaration_order_not_specificity() {
        let map = table(&[".* = Catchall", "exact = Exact"]);
        assert_eq!(map.match_value("exact"), Some("Catchall"));
    }

    #[test]
    fn whole_string_match() {
        let map = table(&["Cluster_NYC = New York"]);
        assert_eq!(map.match_value("Cluster_NYC"), Some("New York"));
        assert_eq!(map.match_value("XCluster_NYC_suffix"), None);
    }

    #[test]
    fn no_match_on_empty_table() {
        let map = RelationMap::default();
        assert_eq!(map.match_value("anything"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn malformed_relation() {
        let err = RelationMap::compile(&["This should not work".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid regex relation: This should not work. Should be of format: regex = value"
        );
    }

    #[test]
    fn invalid_regex() {
        let err = RelationMap::compile(&["[a-z++ = Should not work".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid regex: [a-z++, in relation: [a-z++ = Should not work"
        );
    }

    #[test]
    fn plain_pairs() {
        let pairs = string_pairs(&["owner = Owner Contact".to_string()]).unwrap();
        assert_eq!(pairs, vec![("owner".to_string(), "Owner Contact".to_string())]);
    }
}
