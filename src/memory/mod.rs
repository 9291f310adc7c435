// SPDX-License-Identifier: MIT

//! Learning store - skills from successful runs, reflections on failed ones

pub mod file_store;

pub use file_store::FileLearningStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::adk::error::ModelError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failure analysis failed: {0}")]
    Analysis(#[from] ModelError),
}

/// One recorded conversation entry of a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub role: String,
    pub content: String,
}

/// Workflow pattern learned from a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub workflow_steps: Vec<WorkflowStep>,
    pub success_conditions: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub usage_count: u32,
}

/// Why a task failed and what to do differently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub failure_reason: String,
    #[serde(alias = "lessons_learned", default)]
    pub lessons: Vec<String>,
}

/// Post-mortem of a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub task_description: String,
    pub failure_reason: String,
    pub lessons_learned: Vec<String>,
    #[serde(default)]
    pub similar_tasks: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Reflection {
    pub fn new(task_description: impl Into<String>, analysis: FailureAnalysis) -> Self {
        Self {
            task_description: task_description.into(),
            failure_reason: analysis.failure_reason,
            lessons_learned: analysis.lessons,
            similar_tasks: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// Where the memory hook persists what a run taught
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn save_skill(&self, skill: &Skill) -> Result<bool, StoreError>;

    async fn analyze_failure(
        &self,
        task_description: &str,
        error_message: &str,
    ) -> Result<FailureAnalysis, StoreError>;

    async fn save_reflection(&self, reflection: &Reflection) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_accepts_lessons_learned() {
        let analysis: FailureAnalysis = serde_json::from_str(
            r#"{"failure_reason": "timeout", "lessons_learned": ["retry sooner"]}"#,
        )
        .unwrap();
        assert_eq!(analysis.lessons, vec!["retry sooner"]);

        let reflection = Reflection::new("fetch page", analysis);
        assert_eq!(reflection.failure_reason, "timeout");
        assert_eq!(reflection.lessons_learned, vec!["retry sooner"]);
    }
}
