//! Tool registry: maps agent tool names to trifecta conditions.
//!
//! Loaded once from declarative JSON at startup and immutable afterwards,
//! so lookups need no locking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// One of the three trifecta conditions. Closed set; a fourth value cannot
/// be constructed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    PrivateData,
    UntrustedContent,
    ExfiltrationVector,
}

impl Condition {
    /// All conditions, in canonical order.
    pub const ALL: [Condition; 3] = [
        Condition::PrivateData,
        Condition::UntrustedContent,
        Condition::ExfiltrationVector,
    ];

    fn bit(self) -> u8 {
        match self {
            Condition::PrivateData => 1 << 0,
            Condition::UntrustedContent => 1 << 1,
            Condition::ExfiltrationVector => 1 << 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::PrivateData => "private_data",
            Condition::UntrustedContent => "untrusted_content",
            Condition::ExfiltrationVector => "exfiltration_vector",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-cardinality set over the three conditions, packed into one byte.
/// Makes "would complete all three" a cheap cardinality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionSet(u8);

impl ConditionSet {
    pub const EMPTY: ConditionSet = ConditionSet(0);

    pub fn contains(self, condition: Condition) -> bool {
        self.0 & condition.bit() != 0
    }

    #[must_use]
    pub fn with(self, condition: Condition) -> ConditionSet {
        ConditionSet(self.0 | condition.bit())
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when all three conditions are active.
    pub fn is_complete(self) -> bool {
        self.len() == Condition::ALL.len()
    }

    /// Members in canonical order.
    pub fn members(self) -> Vec<Condition> {
        Condition::ALL
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect()
    }

    /// Conditions not yet active, in canonical order.
    pub fn missing(self) -> Vec<Condition> {
        Condition::ALL
            .into_iter()
            .filter(|c| !self.contains(*c))
            .collect()
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ConditionSet::EMPTY, ConditionSet::with)
    }
}

impl Serialize for ConditionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.members().serialize(serializer)
    }
}

/// Immutable tool definition from the registry source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub condition: Condition,
    /// Descriptive label only; carries no policy weight.
    pub category: String,
}

/// Registry source file shape.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    tools: Vec<ToolDefinition>,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read tool registry from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed tool registry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate tool name in registry: {0}")]
    DuplicateTool(String),
    #[error("tool with empty name in registry")]
    EmptyToolName,
}

/// Name-keyed tool lookup. Construction validates the source; any error is
/// startup-fatal for the process.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

/// Registry shipped with the binary; used when no override path is given.
const DEFAULT_TOOLS: &str = include_str!("../config/tools.json");

impl ToolRegistry {
    /// Build the registry from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;

        let mut tools = HashMap::with_capacity(file.tools.len());
        for tool in file.tools {
            if tool.name.is_empty() {
                return Err(RegistryError::EmptyToolName);
            }
            if tools.contains_key(&tool.name) {
                return Err(RegistryError::DuplicateTool(tool.name));
            }
            tools.insert(tool.name.clone(), tool);
        }

        Ok(Self { tools })
    }

    /// Build the registry from a JSON file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build the registry embedded in the binary.
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_json(DEFAULT_TOOLS)
    }

    /// Case-sensitive exact-match lookup.
    pub fn resolve(&self, tool_name: &str) -> Option<&ToolDefinition> {
        self.tools.get(tool_name)
    }

    /// All definitions, sorted by name for stable output.
    pub fn all(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_loads() {
        let registry = ToolRegistry::embedded().unwrap();
        assert!(!registry.is_empty());
        assert!(registry.len() >= 4);

        let tool = registry.resolve("read_db").unwrap();
        assert_eq!(tool.condition, Condition::PrivateData);

        let tool = registry.resolve("send_http").unwrap();
        assert_eq!(tool.condition, Condition::ExfiltrationVector);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = ToolRegistry::embedded().unwrap();
        assert!(registry.resolve("read_db").is_some());
        assert!(registry.resolve("Read_DB").is_none());
        assert!(registry.resolve("nonexistent").is_none());
    }

    #[test]
    fn duplicate_tool_name_is_rejected() {
        let json = r#"{"tools": [
            {"name": "read_db", "condition": "private_data", "category": "database"},
            {"name": "read_db", "condition": "exfiltration_vector", "category": "database"}
        ]}"#;
        let err = ToolRegistry::from_json(json).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "read_db"));
    }

    #[test]
    fn invalid_condition_is_rejected() {
        let json = r#"{"tools": [
            {"name": "read_db", "condition": "telepathy", "category": "database"}
        ]}"#;
        assert!(matches!(
            ToolRegistry::from_json(json),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn empty_tool_name_is_rejected() {
        let json = r#"{"tools": [
            {"name": "", "condition": "private_data", "category": "database"}
        ]}"#;
        assert!(matches!(
            ToolRegistry::from_json(json),
            Err(RegistryError::EmptyToolName)
        ));
    }

    #[test]
    fn from_path_reads_a_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tools": [{{"name": "dump_logs", "condition": "private_data", "category": "observability"}}]}}"#
        )
        .unwrap();

        let registry = ToolRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("dump_logs").is_some());
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let err = ToolRegistry::from_path("/nonexistent/tools.json").unwrap_err();
        assert!(matches!(err, RegistryError::Read { .. }));
    }

    #[test]
    fn condition_set_operations() {
        let set = ConditionSet::EMPTY;
        assert!(set.is_empty());
        assert_eq!(set.missing(), Condition::ALL.to_vec());

        let set = set.with(Condition::PrivateData);
        assert!(set.contains(Condition::PrivateData));
        assert_eq!(set.len(), 1);

        // Adding an already-present member is a no-op.
        let same = set.with(Condition::PrivateData);
        assert_eq!(set, same);

        let full = set
            .with(Condition::UntrustedContent)
            .with(Condition::ExfiltrationVector);
        assert!(full.is_complete());
        assert!(full.missing().is_empty());
    }

    #[test]
    fn condition_set_serializes_in_canonical_order() {
        let set: ConditionSet = [Condition::ExfiltrationVector, Condition::PrivateData]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["private_data","exfiltration_vector"]"#);
    }
}
