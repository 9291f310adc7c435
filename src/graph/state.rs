// SPDX-License-Identifier: MIT

//! Shared run state and the patches nodes return
//!
//! Every field has one reducer: the conversation appends, outputs merge per
//! key, everything else is overwritten. Nodes only describe what they touched
//! in a [`StatePatch`]; [`TeamState::apply`] does the merging.

use crate::adk::model::Message;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::Target;

/// Critic verdict on the current plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Verdict {
    #[serde(rename = "APPROVE", alias = "approve", alias = "Approve")]
    Approve,
    #[serde(rename = "REJECT", alias = "reject", alias = "Reject")]
    Reject,
}

/// How a patch value merges into state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerType {
    /// Replace the value
    Overwrite,
    /// Extend a sequence
    Append,
    /// Replace per key
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Conversation,
    Next,
    Task,
    Plan,
    Critique,
    Feedback,
    CritiqueRounds,
    WorkerRole,
    WorkerInstructions,
    TaskSuccess,
    ReflectionEnabled,
    SkillLearningEnabled,
    Outputs,
}

impl StateField {
    pub const ALL: [StateField; 13] = [
        StateField::Conversation,
        StateField::Next,
        StateField::Task,
        StateField::Plan,
        StateField::Critique,
        StateField::Feedback,
        StateField::CritiqueRounds,
        StateField::WorkerRole,
        StateField::WorkerInstructions,
        StateField::TaskSuccess,
        StateField::ReflectionEnabled,
        StateField::SkillLearningEnabled,
        StateField::Outputs,
    ];

    pub fn reducer(self) -> ReducerType {
        match self {
            StateField::Conversation => ReducerType::Append,
            StateField::Outputs => ReducerType::Merge,
            _ => ReducerType::Overwrite,
        }
    }
}

/// Combines a stored value with an update under a reducer
trait Reduce {
    fn reduce(&mut self, update: Self, reducer: ReducerType);
}

impl<T> Reduce for Vec<T> {
    fn reduce(&mut self, update: Self, reducer: ReducerType) {
        match reducer {
            ReducerType::Overwrite => *self = update,
            ReducerType::Append | ReducerType::Merge => self.extend(update),
        }
    }
}

impl<V> Reduce for BTreeMap<String, V> {
    fn reduce(&mut self, update: Self, reducer: ReducerType) {
        match reducer {
            ReducerType::Overwrite => *self = update,
            ReducerType::Append | ReducerType::Merge => self.extend(update),
        }
    }
}

// Scalars have nothing to append to or merge with.
macro_rules! reduce_by_overwrite {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reduce for $ty {
                fn reduce(&mut self, update: Self, _reducer: ReducerType) {
                    *self = update;
                }
            }
        )*
    };
}

reduce_by_overwrite!(
    String,
    u32,
    bool,
    Option<String>,
    Option<bool>,
    Option<Target>,
    Option<Verdict>,
);

fn update<T: Reduce>(slot: &mut T, value: Option<T>, field: StateField) {
    if let Some(value) = value {
        slot.reduce(value, field.reducer());
    }
}

/// Per-run feature switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunToggles {
    pub reflection_enabled: bool,
    pub skill_learning_enabled: bool,
}

/// State threaded through every node of a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamState {
    pub conversation: Vec<Message>,
    pub next: Option<Target>,
    pub task: String,
    pub plan: String,
    pub critique: Option<Verdict>,
    pub feedback: String,
    pub critique_rounds: u32,
    pub worker_role: Option<String>,
    pub worker_instructions: Option<String>,
    pub task_success: Option<bool>,
    pub reflection_enabled: bool,
    pub skill_learning_enabled: bool,
    pub outputs: BTreeMap<String, Value>,
}

impl TeamState {
    /// Fresh state whose conversation opens with the task as a user message
    pub fn new(task: impl Into<String>) -> Self {
        let task = task.into();
        Self {
            conversation: vec![Message::user(task.clone())],
            task,
            ..Default::default()
        }
    }

    pub fn with_toggles(mut self, toggles: RunToggles) -> Self {
        self.reflection_enabled = toggles.reflection_enabled;
        self.skill_learning_enabled = toggles.skill_learning_enabled;
        self
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.conversation.last()
    }

    /// Merge a patch using each field's declared reducer
    pub fn apply(&mut self, patch: StatePatch) {
        let StatePatch {
            conversation,
            next,
            task,
            plan,
            critique,
            feedback,
            critique_rounds,
            worker_role,
            worker_instructions,
            task_success,
            reflection_enabled,
            skill_learning_enabled,
            outputs,
        } = patch;

        let conversation = (!conversation.is_empty()).then_some(conversation);
        let outputs = (!outputs.is_empty()).then_some(outputs);

        update(&mut self.conversation, conversation, StateField::Conversation);
        update(&mut self.next, next, StateField::Next);
        update(&mut self.task, task, StateField::Task);
        update(&mut self.plan, plan, StateField::Plan);
        update(&mut self.critique, critique, StateField::Critique);
        update(&mut self.feedback, feedback, StateField::Feedback);
        update(&mut self.critique_rounds, critique_rounds, StateField::CritiqueRounds);
        update(&mut self.worker_role, worker_role, StateField::WorkerRole);
        update(
            &mut self.worker_instructions,
            worker_instructions,
            StateField::WorkerInstructions,
        );
        update(&mut self.task_success, task_success, StateField::TaskSuccess);
        update(
            &mut self.reflection_enabled,
            reflection_enabled,
            StateField::ReflectionEnabled,
        );
        update(
            &mut self.skill_learning_enabled,
            skill_learning_enabled,
            StateField::SkillLearningEnabled,
        );
        update(&mut self.outputs, outputs, StateField::Outputs);
    }

    /// Patch that turns a state whose conversation had `base_len` entries
    /// into `self`.
    ///
    /// Carries the conversation entries past `base_len` and every replaced
    /// field as it stands now.
    pub fn into_patch_since(self, base_len: usize) -> StatePatch {
        let conversation = self
            .conversation
            .into_iter()
            .skip(base_len)
            .collect();

        StatePatch {
            conversation,
            next: Some(self.next),
            task: Some(self.task),
            plan: Some(self.plan),
            critique: Some(self.critique),
            feedback: Some(self.feedback),
            critique_rounds: Some(self.critique_rounds),
            worker_role: Some(self.worker_role),
            worker_instructions: Some(self.worker_instructions),
            task_success: Some(self.task_success),
            reflection_enabled: Some(self.reflection_enabled),
            skill_learning_enabled: Some(self.skill_learning_enabled),
            outputs: self.outputs,
        }
    }
}

/// Partial update returned by a node. Absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePatch {
    pub conversation: Vec<Message>,
    pub next: Option<Option<Target>>,
    pub task: Option<String>,
    pub plan: Option<String>,
    pub critique: Option<Option<Verdict>>,
    pub feedback: Option<String>,
    pub critique_rounds: Option<u32>,
    pub worker_role: Option<Option<String>>,
    pub worker_instructions: Option<Option<String>>,
    pub task_success: Option<Option<bool>>,
    pub reflection_enabled: Option<bool>,
    pub skill_learning_enabled: Option<bool>,
    pub outputs: BTreeMap<String, Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.conversation.push(message);
        self
    }

    pub fn next(mut self, target: Target) -> Self {
        self.next = Some(Some(target));
        self
    }

    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn critique(mut self, verdict: Verdict) -> Self {
        self.critique = Some(Some(verdict));
        self
    }

    pub fn feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn critique_rounds(mut self, rounds: u32) -> Self {
        self.critique_rounds = Some(rounds);
        self
    }

    pub fn worker(mut self, role: impl Into<String>, instructions: impl Into<String>) -> Self {
        self.worker_role = Some(Some(role.into()));
        self.worker_instructions = Some(Some(instructions.into()));
        self
    }

    pub fn task_success(mut self, success: bool) -> Self {
        self.task_success = Some(Some(success));
        self
    }

    pub fn output(mut self, key: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    /// Fields this patch writes, in declaration order
    pub fn touched_fields(&self) -> Vec<StateField> {
        StateField::ALL
            .into_iter()
            .filter(|field| match field {
                StateField::Conversation => !self.conversation.is_empty(),
                StateField::Next => self.next.is_some(),
                StateField::Task => self.task.is_some(),
                StateField::Plan => self.plan.is_some(),
                StateField::Critique => self.critique.is_some(),
                StateField::Feedback => self.feedback.is_some(),
                StateField::CritiqueRounds => self.critique_rounds.is_some(),
                StateField::WorkerRole => self.worker_role.is_some(),
                StateField::WorkerInstructions => self.worker_instructions.is_some(),
                StateField::TaskSuccess => self.task_success.is_some(),
                StateField::ReflectionEnabled => self.reflection_enabled.is_some(),
                StateField::SkillLearningEnabled => self.skill_learning_enabled.is_some(),
                StateField::Outputs => !self.outputs.is_empty(),
            })
            .collect()
    }
}
