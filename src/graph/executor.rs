// SPDX-License-Identifier: MIT

//! Graph executor
//!
//! One node runs at a time. After each node the patch is merged, the edge is
//! resolved, and the loop moves on until a route reaches `End`.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::builder::{CompiledEdge, CompiledGraph, Resolved};
use super::error::{EngineError, NodeError, RoutingError, RunFailure};
use super::state::{StateField, TeamState};
use super::types::{NodeKey, Target};

/// Progress notifications emitted while a graph runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    NodeStarted {
        graph: String,
        node: NodeKey,
        step: usize,
        depth: usize,
    },
    NodeCompleted {
        graph: String,
        node: NodeKey,
        updated: Vec<StateField>,
        conversation_len: usize,
        depth: usize,
    },
    Routed {
        graph: String,
        from: NodeKey,
        to: Target,
        depth: usize,
    },
    Finished {
        graph: String,
        steps: usize,
        task_success: Option<bool>,
        depth: usize,
    },
    Failed {
        graph: String,
        node: NodeKey,
        error: String,
        depth: usize,
    },
}

/// Caller-side controls for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum node invocations before the run fails. `None` is unbounded.
    pub step_limit: Option<usize>,
    pub cancel: Option<CancellationToken>,
    pub events: Option<mpsc::Sender<GraphEvent>>,
    /// Nesting level; 0 for a top-level run
    pub depth: usize,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<GraphEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

/// What a node knows about the run invoking it
#[derive(Debug, Clone)]
pub struct RunContext {
    pub graph: String,
    pub node: NodeKey,
    pub step: usize,
    pub depth: usize,
    pub cancel: Option<CancellationToken>,
    pub events: Option<mpsc::Sender<GraphEvent>>,
}

impl RunContext {
    /// Context for invoking a node outside any graph
    pub fn detached(node: NodeKey) -> Self {
        Self {
            graph: String::new(),
            node,
            step: 0,
            depth: 0,
            cancel: None,
            events: None,
        }
    }
}

impl CompiledGraph {
    /// Execute the graph from its entry point until a route reaches `End`
    pub async fn run(
        &self,
        initial: TeamState,
        options: &RunOptions,
    ) -> Result<TeamState, RunFailure> {
        let mut state = initial;
        let mut current = self.entry;
        let mut steps = 0usize;

        log::info!(
            "Starting graph '{}' at '{}' (depth {})",
            self.name,
            self.entry(),
            options.depth
        );

        loop {
            let compiled = &self.nodes[current];
            let key = &compiled.key;

            if options.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                let error = EngineError::Cancelled { at: key.clone() };
                return Err(self.fail(key, error, state, options));
            }
            if let Some(limit) = options.step_limit {
                if steps >= limit {
                    let error = EngineError::StepLimitExceeded { limit };
                    return Err(self.fail(key, error, state, options));
                }
            }
            steps += 1;

            self.emit(
                options,
                GraphEvent::NodeStarted {
                    graph: self.name.clone(),
                    node: key.clone(),
                    step: steps,
                    depth: options.depth,
                },
            );

            let ctx = RunContext {
                graph: self.name.clone(),
                node: key.clone(),
                step: steps,
                depth: options.depth,
                cancel: options.cancel.clone(),
                events: options.events.clone(),
            };

            log::debug!("Graph '{}' step {}: invoking '{}'", self.name, steps, key);
            let patch = match compiled.node.invoke(&state, &ctx).await {
                Ok(patch) => patch,
                Err(NodeError::Routing(source)) => {
                    let error = EngineError::Routing {
                        node: key.clone(),
                        source,
                    };
                    return Err(self.fail(key, error, state, options));
                }
                Err(source) => {
                    let error = EngineError::NodeExecution {
                        node: key.clone(),
                        source,
                    };
                    return Err(self.fail(key, error, state, options));
                }
            };

            let updated = patch.touched_fields();
            state.apply(patch);

            self.emit(
                options,
                GraphEvent::NodeCompleted {
                    graph: self.name.clone(),
                    node: key.clone(),
                    updated,
                    conversation_len: state.conversation.len(),
                    depth: options.depth,
                },
            );

            let next = match self.resolve(compiled.key.clone(), &compiled.edge, &state) {
                Ok(next) => next,
                Err(source) => {
                    let error = EngineError::Routing {
                        node: key.clone(),
                        source,
                    };
                    return Err(self.fail(key, error, state, options));
                }
            };

            self.emit(
                options,
                GraphEvent::Routed {
                    graph: self.name.clone(),
                    from: key.clone(),
                    to: self.target_of(next),
                    depth: options.depth,
                },
            );

            match next {
                Resolved::Node(i) => current = i,
                Resolved::End => {
                    if options.depth == 0 && state.task_success.is_none() {
                        state.task_success = Some(false);
                    }
                    log::info!(
                        "Graph '{}' finished after {} steps (task_success: {:?})",
                        self.name,
                        steps,
                        state.task_success
                    );
                    self.emit(
                        options,
                        GraphEvent::Finished {
                            graph: self.name.clone(),
                            steps,
                            task_success: state.task_success,
                            depth: options.depth,
                        },
                    );
                    return Ok(state);
                }
            }
        }
    }

    fn resolve(
        &self,
        from: NodeKey,
        edge: &CompiledEdge,
        state: &TeamState,
    ) -> Result<Resolved, RoutingError> {
        match edge {
            CompiledEdge::Fixed(to) => Ok(*to),
            CompiledEdge::Conditional { decide, branches } => {
                let choice = decide(state).ok_or_else(|| RoutingError::NoDecision {
                    from: from.clone(),
                })?;
                branches
                    .get(&choice)
                    .copied()
                    .ok_or_else(|| RoutingError::invalid_choice(&from, choice.to_string(), branches.keys()))
            }
        }
    }

    fn fail(
        &self,
        node: &NodeKey,
        error: EngineError,
        state: TeamState,
        options: &RunOptions,
    ) -> RunFailure {
        log::error!("Graph '{}' failed at '{}': {}", self.name, node, error);
        self.emit(
            options,
            GraphEvent::Failed {
                graph: self.name.clone(),
                node: node.clone(),
                error: error.to_string(),
                depth: options.depth,
            },
        );

        RunFailure {
            graph: self.name.clone(),
            node: node.clone(),
            error,
            state: Box::new(state),
        }
    }

    fn emit(&self, options: &RunOptions, event: GraphEvent) {
        if let Some(events) = &options.events {
            // Never wait on a slow or absent listener.
            if let Err(e) = events.try_send(event) {
                log::debug!("Graph '{}' dropped an event: {}", self.name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::Message;
    use crate::graph::builder::GraphBuilder;
    use crate::graph::edge::branches;
    use crate::graph::node::{FnNode, SubgraphNode};
    use crate::graph::state::StatePatch;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn say(name: &'static str) -> FnNode {
        FnNode::new(move |_| Ok(StatePatch::new().message(Message::assistant(name).named(name))))
    }

    fn by_next(state: &TeamState) -> Option<Target> {
        state.next.clone()
    }

    /// Supervisor that routes to Coder once, then finishes
    fn two_step_supervisor() -> FnNode {
        FnNode::new(|state| {
            let coded = state.conversation.iter().any(|m| m.name.as_deref() == Some("Coder"));
            let patch = if coded {
                StatePatch::new().next(Target::End).task_success(true)
            } else {
                StatePatch::new().next(Target::node(NodeKey::Coder))
            };
            Ok(patch)
        })
    }

    fn coding_graph() -> CompiledGraph {
        GraphBuilder::new("coding")
            .add_node(NodeKey::Supervisor, two_step_supervisor())
            .add_node(NodeKey::Coder, say("Coder"))
            .add_conditional_edges(
                NodeKey::Supervisor,
                by_next,
                branches([Target::End, Target::node(NodeKey::Coder)]),
            )
            .add_edge(NodeKey::Coder, NodeKey::Supervisor)
            .set_entry_point(NodeKey::Supervisor)
            .compile()
            .unwrap()
    }

    #[tokio::test]
    async fn test_runs_until_end() {
        let graph = coding_graph();
        let state = graph.run(TeamState::new("task"), &RunOptions::new()).await.unwrap();

        assert_eq!(state.conversation.len(), 2);
        assert_eq!(state.task_success, Some(true));
        assert_eq!(state.next, Some(Target::End));
    }

    #[tokio::test]
    async fn test_unset_task_success_finalized_false() {
        let graph = GraphBuilder::new("single")
            .add_node(NodeKey::Coder, say("Coder"))
            .add_edge(NodeKey::Coder, Target::End)
            .set_entry_point(NodeKey::Coder)
            .compile()
            .unwrap();

        let state = graph.run(TeamState::new("task"), &RunOptions::new()).await.unwrap();
        assert_eq!(state.task_success, Some(false));
    }

    #[tokio::test]
    async fn test_choice_outside_options_is_routing_error() {
        let graph = GraphBuilder::new("rogue")
            .add_node(
                NodeKey::Supervisor,
                FnNode::new(|_| Ok(StatePatch::new().next(Target::node(NodeKey::custom("Poet"))))),
            )
            .add_node(NodeKey::Coder, say("Coder"))
            .add_conditional_edges(
                NodeKey::Supervisor,
                by_next,
                branches([Target::End, Target::node(NodeKey::Coder)]),
            )
            .add_edge(NodeKey::Coder, NodeKey::Supervisor)
            .set_entry_point(NodeKey::Supervisor)
            .compile()
            .unwrap();

        let failure = graph.run(TeamState::new("task"), &RunOptions::new()).await.unwrap_err();
        assert!(failure.is_routing());
        assert_eq!(failure.node, NodeKey::Supervisor);
        // No transition happened: Coder never spoke.
        assert_eq!(failure.state.conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_decision_is_routing_error() {
        let graph = GraphBuilder::new("silent")
            .add_node(NodeKey::Supervisor, FnNode::new(|_| Ok(StatePatch::new())))
            .add_conditional_edges(NodeKey::Supervisor, by_next, branches([Target::End]))
            .set_entry_point(NodeKey::Supervisor)
            .compile()
            .unwrap();

        let failure = graph.run(TeamState::new("task"), &RunOptions::new()).await.unwrap_err();
        assert!(matches!(
            failure.error,
            EngineError::Routing {
                source: RoutingError::NoDecision { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let graph = GraphBuilder::new("loop")
            .add_node(NodeKey::Planner, say("Planner"))
            .add_edge(NodeKey::Planner, NodeKey::Planner)
            .set_entry_point(NodeKey::Planner)
            .compile()
            .unwrap();

        let failure = graph
            .run(TeamState::new("task"), &RunOptions::new().with_step_limit(5))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, EngineError::StepLimitExceeded { limit: 5 }));
        assert_eq!(failure.state.conversation.len(), 6);
    }

    #[tokio::test]
    async fn test_cancellation_between_steps() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let graph = GraphBuilder::new("cancel")
            .add_node(
                NodeKey::Planner,
                FnNode::new(move |_| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                        trigger.cancel();
                    }
                    Ok(StatePatch::new())
                }),
            )
            .add_edge(NodeKey::Planner, NodeKey::Planner)
            .set_entry_point(NodeKey::Planner)
            .compile()
            .unwrap();

        let failure = graph
            .run(TeamState::new("task"), &RunOptions::new().with_cancel(token))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, EngineError::Cancelled { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_node_error_is_execution_failure() {
        let graph = GraphBuilder::new("broken")
            .add_node(NodeKey::Coder, FnNode::new(|_| Err(NodeError::Other("boom".into()))))
            .add_edge(NodeKey::Coder, Target::End)
            .set_entry_point(NodeKey::Coder)
            .compile()
            .unwrap();

        let failure = graph.run(TeamState::new("task"), &RunOptions::new()).await.unwrap_err();
        assert!(matches!(failure.error, EngineError::NodeExecution { .. }));
    }

    #[tokio::test]
    async fn test_events_stream() {
        let (tx, mut rx) = mpsc::channel(64);
        let graph = coding_graph();
        graph
            .run(TeamState::new("task"), &RunOptions::new().with_events(tx))
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        // Supervisor, Coder, Supervisor: three started/completed/routed triples plus Finished.
        assert_eq!(events.len(), 10);
        assert!(matches!(events.last(), Some(GraphEvent::Finished { steps: 3, .. })));
    }

    #[tokio::test]
    async fn test_full_event_buffer_does_not_stall_run() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let options = RunOptions::new().with_events(tx);

        let graph = coding_graph();
        let run = graph.run(TeamState::new("task"), &options);
        let state = tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("run blocked on a full event channel")
            .unwrap();

        assert_eq!(state.task_success, Some(true));
        assert!(matches!(rx.try_recv(), Ok(GraphEvent::NodeStarted { step: 1, .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subgraph_matches_standalone_run() {
        let inner = Arc::new(coding_graph());
        let standalone = inner
            .run(TeamState::new("task"), &RunOptions::new())
            .await
            .unwrap();

        let outer = GraphBuilder::new("outer")
            .add_node(NodeKey::CodingTeam, SubgraphNode::new(inner.clone()))
            .add_edge(NodeKey::CodingTeam, Target::End)
            .set_entry_point(NodeKey::CodingTeam)
            .compile()
            .unwrap();
        let embedded = outer
            .run(TeamState::new("task"), &RunOptions::new())
            .await
            .unwrap();

        assert_eq!(embedded, standalone);
    }
}
