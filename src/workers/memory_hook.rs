// SPDX-License-Identifier: MIT

//! Memory hook - runs between the supervisor's FINISH and termination
//!
//! A successful run is saved as a skill when skill learning is on; a failed
//! run is analyzed and saved as a reflection when reflection is on. Store
//! failures are logged and never fail the run.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::graph::{Node, NodeError, RunContext, StatePatch, TeamState};
use crate::memory::{LearningStore, Reflection, Skill, WorkflowStep};

pub const DEFAULT_TAIL_LEN: usize = 20;
pub const DEFAULT_CONTENT_LIMIT: usize = 200;

pub struct MemoryHook {
    store: Arc<dyn LearningStore>,
    tail_len: usize,
    content_limit: usize,
}

impl MemoryHook {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self {
            store,
            tail_len: DEFAULT_TAIL_LEN,
            content_limit: DEFAULT_CONTENT_LIMIT,
        }
    }

    /// Number of trailing conversation entries recorded as skill steps
    pub fn with_tail_len(mut self, tail_len: usize) -> Self {
        self.tail_len = tail_len;
        self
    }

    /// Maximum characters kept per recorded step
    pub fn with_content_limit(mut self, limit: usize) -> Self {
        self.content_limit = limit;
        self
    }

    pub fn build_skill(&self, state: &TeamState) -> Skill {
        let now = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let start = state.conversation.len().saturating_sub(self.tail_len);

        let workflow_steps = state.conversation[start..]
            .iter()
            .map(|m| WorkflowStep {
                role: m.name.clone().unwrap_or_else(|| m.role.as_str().to_string()),
                content: m.content.chars().take(self.content_limit).collect(),
            })
            .collect();

        let provider = state
            .next
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());

        let mut metadata = BTreeMap::new();
        metadata.insert("plan".to_string(), Value::String(state.plan.clone()));
        metadata.insert("provider".to_string(), Value::String(provider));

        Skill {
            name: format!("skill_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8]),
            description: state.task.clone(),
            workflow_steps,
            success_conditions: vec!["Task completed successfully".to_string()],
            metadata,
            created_at: now,
            usage_count: 0,
        }
    }

    /// Error text for a failed run: critic feedback, then a recorded error
    pub fn error_text(state: &TeamState) -> String {
        if !state.feedback.is_empty() {
            return state.feedback.clone();
        }
        match state.outputs.get("error") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null) | None => "No error message".to_string(),
            Some(other) => other.to_string(),
        }
    }

    async fn learn_skill(&self, state: &TeamState) -> Option<String> {
        let skill = self.build_skill(state);
        match self.store.save_skill(&skill).await {
            Ok(true) => Some(skill.name),
            Ok(false) => {
                log::warn!("Learning store declined skill {}", skill.name);
                None
            }
            Err(e) => {
                log::warn!("Failed to save skill {}: {}", skill.name, e);
                None
            }
        }
    }

    async fn reflect(&self, state: &TeamState) -> bool {
        let error = Self::error_text(state);
        let analysis = match self.store.analyze_failure(&state.task, &error).await {
            Ok(analysis) => analysis,
            Err(e) => {
                log::warn!("Failed to analyze failure: {}", e);
                return false;
            }
        };

        let mut reflection = Reflection::new(state.task.clone(), analysis);
        reflection
            .metadata
            .insert("original_error".to_string(), Value::String(error));

        match self.store.save_reflection(&reflection).await {
            Ok(saved) => {
                if saved {
                    log::info!("Reflection saved, lessons: {:?}", reflection.lessons_learned);
                }
                saved
            }
            Err(e) => {
                log::warn!("Failed to save reflection: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Node for MemoryHook {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let success = state.task_success.unwrap_or(false);
        let mut patch = StatePatch::new().task_success(success);

        if success && state.skill_learning_enabled {
            if let Some(name) = self.learn_skill(state).await {
                patch = patch.output("skill_saved", json!(name));
            }
        }

        if !success && state.reflection_enabled && self.reflect(state).await {
            patch = patch.output("reflection_saved", json!(true));
        }

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::Message;
    use crate::graph::NodeKey;
    use crate::memory::{FailureAnalysis, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LearningStore for FailingStore {
        async fn save_skill(&self, _skill: &Skill) -> Result<bool, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::other("disk full").into())
        }

        async fn analyze_failure(&self, _t: &str, e: &str) -> Result<FailureAnalysis, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(FailureAnalysis {
                failure_reason: e.to_string(),
                lessons: vec![],
            })
        }

        async fn save_reflection(&self, _r: &Reflection) -> Result<bool, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::other("disk full").into())
        }
    }

    fn long_state(entries: usize) -> TeamState {
        let mut state = TeamState::new("task");
        for i in 0..entries {
            state
                .conversation
                .push(Message::assistant("x".repeat(300)).named(format!("W{}", i)));
        }
        state
    }

    #[test]
    fn test_skill_keeps_truncated_tail() {
        let hook = MemoryHook::new(Arc::new(FailingStore::default()));
        let skill = hook.build_skill(&long_state(30));

        assert_eq!(skill.workflow_steps.len(), DEFAULT_TAIL_LEN);
        assert_eq!(skill.workflow_steps[0].role, "W10");
        assert!(skill.workflow_steps.iter().all(|s| s.content.len() == 200));
        assert!(skill.name.starts_with("skill_"));
        assert_eq!(skill.metadata["provider"], "unknown");
    }

    #[test]
    fn test_error_text_precedence() {
        let mut state = TeamState::new("task");
        assert_eq!(MemoryHook::error_text(&state), "No error message");
        state.outputs.insert("error".into(), json!("timeout"));
        assert_eq!(MemoryHook::error_text(&state), "timeout");
        state.feedback = "plan was unsafe".into();
        assert_eq!(MemoryHook::error_text(&state), "plan was unsafe");
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let store = Arc::new(FailingStore::default());
        let hook = MemoryHook::new(store.clone());
        let ctx = RunContext::detached(NodeKey::MemoryHook);

        let mut state = TeamState::new("task");
        state.skill_learning_enabled = true;
        state.task_success = Some(true);
        let patch = hook.invoke(&state, &ctx).await.unwrap();
        assert!(patch.outputs.is_empty());
        assert_eq!(patch.task_success, Some(Some(true)));

        state.reflection_enabled = true;
        state.task_success = None;
        let patch = hook.invoke(&state, &ctx).await.unwrap();
        assert_eq!(patch.task_success, Some(Some(false)));
        assert!(patch.outputs.is_empty());
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    }
}
