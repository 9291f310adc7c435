// SPDX-License-Identifier: MIT

//! Team loader - flat teams declared in YAML
//!
//! ```yaml
//! name: release-desk
//! description: Drafts release notes
//! workers:
//!   - name: Historian
//!     instructions: Summarize the merged changes.
//!   - name: Writer
//!     instructions: Turn the summary into release notes.
//!     include_plan: true
//! dynamic_worker: true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::supervised_team;
use crate::adk::error::CadreError;
use crate::adk::model::Model;
use crate::graph::{CompiledGraph, Node, NodeKey, Target, FINISH};
use crate::workers::{AdHocWorker, PersonaWorker, SupervisorNode};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TeamDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Replaces the default supervisor prompt; `{members}` is substituted
    #[serde(default)]
    pub supervisor_prompt: Option<String>,
    pub workers: Vec<WorkerDefinition>,
    /// Let the supervisor summon an ad-hoc specialist
    #[serde(default)]
    pub dynamic_worker: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkerDefinition {
    pub name: String,
    pub instructions: String,
    #[serde(default)]
    pub include_plan: bool,
}

/// Loads team definitions from YAML files
pub struct TeamLoader;

impl TeamLoader {
    pub fn load_team<P: AsRef<Path>>(path: P) -> Result<TeamDefinition, CadreError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(content: &str) -> Result<TeamDefinition, CadreError> {
        let def: TeamDefinition = serde_yaml::from_str(content)?;
        def.validate()?;
        Ok(def)
    }
}

impl TeamDefinition {
    fn validate(&self) -> Result<(), CadreError> {
        if self.workers.is_empty() {
            return Err(CadreError::config(format!(
                "team '{}' declares no workers",
                self.name
            )));
        }
        for worker in &self.workers {
            let name = worker.name.trim();
            if name.is_empty() || name == FINISH || NodeKey::from(name) == NodeKey::Supervisor {
                return Err(CadreError::config(format!(
                    "team '{}': '{}' is not a usable worker name",
                    self.name, worker.name
                )));
            }
            if self.dynamic_worker && NodeKey::from(name) == NodeKey::AdHocWorker {
                return Err(CadreError::config(format!(
                    "team '{}': AdHocWorker is reserved for the dynamic worker",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Compile into a supervisor-led graph
    pub fn build(&self, model: Arc<dyn Model>) -> Result<CompiledGraph, CadreError> {
        self.validate()?;

        let mut member_keys: Vec<NodeKey> = Vec::with_capacity(self.workers.len());
        let mut members: Vec<(NodeKey, Arc<dyn Node>)> = Vec::with_capacity(self.workers.len() + 1);
        for worker in &self.workers {
            let key = NodeKey::custom(worker.name.trim());
            let node = PersonaWorker::new(worker.name.trim(), worker.instructions.clone(), model.clone())
                .with_plan(worker.include_plan);
            member_keys.push(key.clone());
            members.push((key, Arc::new(node)));
        }

        let mut supervisor = SupervisorNode::new(NodeKey::Supervisor, member_keys, model.clone());
        if let Some(prompt) = &self.supervisor_prompt {
            supervisor = supervisor.with_system_prompt(prompt.clone());
        }
        if self.dynamic_worker {
            supervisor = supervisor.with_dynamic_worker(NodeKey::AdHocWorker);
            members.push((NodeKey::AdHocWorker, Arc::new(AdHocWorker::new(model))));
        }

        Ok(supervised_team(&self.name, supervisor, members, Target::End)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::scripted::ScriptedModel;
    use crate::graph::GraphDefinitionError;

    const TEAM: &str = r#"
name: release-desk
description: Drafts release notes
workers:
  - name: Historian
    instructions: Summarize the merged changes.
  - name: Writer
    instructions: Turn the summary into release notes.
    include_plan: true
dynamic_worker: true
"#;

    fn model() -> Arc<dyn Model> {
        Arc::new(ScriptedModel::new(Vec::<String>::new()))
    }

    #[test]
    fn test_parse_team() {
        let def = TeamLoader::parse_yaml(TEAM).unwrap();
        assert_eq!(def.name, "release-desk");
        assert_eq!(def.workers.len(), 2);
        assert!(def.workers[1].include_plan);
        assert!(def.dynamic_worker);
    }

    #[test]
    fn test_build_team() {
        let graph = TeamLoader::parse_yaml(TEAM).unwrap().build(model()).unwrap();
        assert_eq!(graph.name(), "release-desk");
        assert!(graph.contains(&NodeKey::custom("Historian")));
        assert!(graph.contains(&NodeKey::AdHocWorker));
        assert_eq!(graph.node_keys().count(), 4);
    }

    #[test]
    fn test_rejects_empty_team() {
        let err = TeamLoader::parse_yaml("name: empty\nworkers: []\n").unwrap_err();
        assert!(matches!(err, CadreError::Config(_)));
    }

    #[test]
    fn test_rejects_reserved_names() {
        let yaml = "name: bad\nworkers:\n  - name: FINISH\n    instructions: stop\n";
        assert!(matches!(TeamLoader::parse_yaml(yaml), Err(CadreError::Config(_))));
    }

    #[test]
    fn test_duplicate_worker_is_definition_error() {
        let def = TeamDefinition {
            name: "twins".into(),
            description: String::new(),
            supervisor_prompt: None,
            workers: vec![
                WorkerDefinition {
                    name: "Echo".into(),
                    instructions: "repeat".into(),
                    include_plan: false,
                },
                WorkerDefinition {
                    name: "Echo".into(),
                    instructions: "repeat".into(),
                    include_plan: false,
                },
            ],
            dynamic_worker: false,
        };
        let err = def.build(model()).unwrap_err();
        assert!(matches!(
            err,
            CadreError::Definition(GraphDefinitionError::DuplicateNode(_))
        ));
    }
}
