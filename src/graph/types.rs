// SPDX-License-Identifier: MIT

//! Node keys and route targets

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Label a supervisor uses to end its graph
pub const FINISH: &str = "FINISH";

/// Name of a node in a graph.
///
/// Built-in workers have their own variants; anything else is `Custom`.
/// Parsing a built-in name always yields the built-in variant, so two keys
/// with the same display name are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKey {
    Supervisor,
    TopSupervisor,
    ResearchSupervisor,
    CodingSupervisor,
    Planner,
    Critic,
    WebSurfer,
    DocumentAnalyst,
    Coder,
    ResearchTeam,
    CodingTeam,
    AdHocWorker,
    MemoryHook,
    Custom(String),
}

impl NodeKey {
    const BUILT_IN: [NodeKey; 13] = [
        NodeKey::Supervisor,
        NodeKey::TopSupervisor,
        NodeKey::ResearchSupervisor,
        NodeKey::CodingSupervisor,
        NodeKey::Planner,
        NodeKey::Critic,
        NodeKey::WebSurfer,
        NodeKey::DocumentAnalyst,
        NodeKey::Coder,
        NodeKey::ResearchTeam,
        NodeKey::CodingTeam,
        NodeKey::AdHocWorker,
        NodeKey::MemoryHook,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NodeKey::Supervisor => "Supervisor",
            NodeKey::TopSupervisor => "TopSupervisor",
            NodeKey::ResearchSupervisor => "ResearchSupervisor",
            NodeKey::CodingSupervisor => "CodingSupervisor",
            NodeKey::Planner => "Planner",
            NodeKey::Critic => "Critic",
            NodeKey::WebSurfer => "WebSurfer",
            NodeKey::DocumentAnalyst => "DocumentAnalyst",
            NodeKey::Coder => "Coder",
            NodeKey::ResearchTeam => "ResearchTeam",
            NodeKey::CodingTeam => "CodingTeam",
            NodeKey::AdHocWorker => "AdHocWorker",
            NodeKey::MemoryHook => "MemoryHook",
            NodeKey::Custom(name) => name,
        }
    }

    /// Key for an integrator-defined node
    pub fn custom(name: impl Into<String>) -> Self {
        NodeKey::from(name.into())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for NodeKey {
    fn from(name: String) -> Self {
        NodeKey::BUILT_IN
            .iter()
            .find(|key| key.as_str() == name)
            .cloned()
            .unwrap_or(NodeKey::Custom(name))
    }
}

impl From<&str> for NodeKey {
    fn from(name: &str) -> Self {
        NodeKey::from(name.to_string())
    }
}

impl From<NodeKey> for String {
    fn from(key: NodeKey) -> Self {
        match key {
            NodeKey::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for NodeKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeKey::from(s))
    }
}

/// Where control goes after a node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    Node(NodeKey),
    End,
}

impl Target {
    pub fn node(key: impl Into<NodeKey>) -> Self {
        Target::Node(key.into())
    }

    pub fn as_node(&self) -> Option<&NodeKey> {
        match self {
            Target::Node(key) => Some(key),
            Target::End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(key) => write!(f, "{}", key),
            Target::End => f.write_str(FINISH),
        }
    }
}

impl From<NodeKey> for Target {
    fn from(key: NodeKey) -> Self {
        Target::Node(key)
    }
}

impl From<String> for Target {
    fn from(label: String) -> Self {
        if label == FINISH {
            Target::End
        } else {
            Target::Node(NodeKey::from(label))
        }
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_names_parse_to_variants() {
        assert_eq!(NodeKey::from("Planner"), NodeKey::Planner);
        assert_eq!(NodeKey::custom("Coder"), NodeKey::Coder);
        assert_eq!(NodeKey::from("Poet"), NodeKey::Custom("Poet".into()));
    }

    #[test]
    fn test_target_labels() {
        assert_eq!(Target::from(FINISH.to_string()), Target::End);
        assert_eq!(Target::End.to_string(), "FINISH");
        assert_eq!(
            Target::from("ResearchTeam".to_string()),
            Target::Node(NodeKey::ResearchTeam)
        );
    }

    #[test]
    fn test_serde_as_strings() {
        let json = serde_json::to_string(&Target::node(NodeKey::AdHocWorker)).unwrap();
        assert_eq!(json, "\"AdHocWorker\"");
        let back: Target = serde_json::from_str("\"FINISH\"").unwrap();
        assert_eq!(back, Target::End);
    }
}
