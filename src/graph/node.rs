// SPDX-License-Identifier: MIT

//! Graph nodes
//!
//! A node reads the current state and returns the fields it wants to change.
//! [`SubgraphNode`] lets a whole compiled graph act as one node of a parent.

use async_trait::async_trait;
use std::sync::Arc;

use super::builder::CompiledGraph;
use super::error::NodeError;
use super::executor::{RunContext, RunOptions};
use super::state::{StatePatch, TeamState};

#[async_trait]
pub trait Node: Send + Sync {
    async fn invoke(&self, state: &TeamState, ctx: &RunContext) -> Result<StatePatch, NodeError>;
}

type NodeFn = dyn Fn(&TeamState) -> Result<StatePatch, NodeError> + Send + Sync;

/// Node backed by a synchronous closure
pub struct FnNode {
    f: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TeamState) -> Result<StatePatch, NodeError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl Node for FnNode {
    async fn invoke(&self, state: &TeamState, _ctx: &RunContext) -> Result<StatePatch, NodeError> {
        (self.f)(state)
    }
}

/// Runs a compiled graph to completion as a single step of its parent
pub struct SubgraphNode {
    graph: Arc<CompiledGraph>,
}

impl SubgraphNode {
    pub fn new(graph: Arc<CompiledGraph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl Node for SubgraphNode {
    async fn invoke(&self, state: &TeamState, ctx: &RunContext) -> Result<StatePatch, NodeError> {
        let base_len = state.conversation.len();
        let mut initial = state.clone();
        initial.next = None;

        // Parent step limit counts parent steps only.
        let options = RunOptions {
            step_limit: None,
            cancel: ctx.cancel.clone(),
            events: ctx.events.clone(),
            depth: ctx.depth + 1,
        };

        log::debug!(
            "Entering subgraph '{}' from '{}' (depth {})",
            self.graph.name(),
            ctx.graph,
            options.depth
        );

        let final_state = self
            .graph
            .run(initial, &options)
            .await
            .map_err(|failure| NodeError::Subgraph(Box::new(failure)))?;

        Ok(final_state.into_patch_since(base_len))
    }
}
