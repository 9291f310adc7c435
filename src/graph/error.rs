// SPDX-License-Identifier: MIT

//! Graph compile and run errors

use thiserror::Error;

use super::state::TeamState;
use super::types::{NodeKey, Target};
use crate::adk::error::ModelError;
use crate::memory::StoreError;

/// Problems found while compiling a graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphDefinitionError {
    #[error("node '{0}' is registered twice")]
    DuplicateNode(NodeKey),

    #[error("node '{0}' already has an outgoing edge")]
    DuplicateEdge(NodeKey),

    #[error("edge from '{from}' references unknown node '{to}'")]
    UnknownSuccessor { from: NodeKey, to: NodeKey },

    #[error("edge declared from unregistered node '{0}'")]
    UnknownSource(NodeKey),

    #[error("no entry point set")]
    MissingEntry,

    #[error("entry point '{0}' is not a registered node")]
    UnknownEntry(NodeKey),

    #[error("node '{0}' has no outgoing edge")]
    MissingEdge(NodeKey),

    #[error("conditional edge from '{0}' has no options")]
    EmptyBranches(NodeKey),
}

/// A routing decision that cannot be followed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("'{from}' chose '{chosen}', expected one of [{}]", .options.join(", "))]
    InvalidChoice {
        from: NodeKey,
        chosen: String,
        options: Vec<String>,
    },

    #[error("'{from}' produced an unparsable decision: {reason}")]
    Unparsable { from: NodeKey, reason: String },

    #[error("'{from}' routed to the dynamic worker without '{field}'")]
    MissingWorkerField { from: NodeKey, field: &'static str },

    #[error("router for '{from}' made no decision")]
    NoDecision { from: NodeKey },
}

impl RoutingError {
    pub fn invalid_choice<'a>(
        from: &NodeKey,
        chosen: impl Into<String>,
        options: impl IntoIterator<Item = &'a Target>,
    ) -> Self {
        Self::InvalidChoice {
            from: from.clone(),
            chosen: chosen.into(),
            options: options.into_iter().map(ToString::to_string).collect(),
        }
    }
}

/// Error returned by a node invocation
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("subgraph failed: {0}")]
    Subgraph(Box<RunFailure>),

    #[error("{0}")]
    Other(String),
}

/// Why a run stopped early
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("routing failed at '{node}': {source}")]
    Routing {
        node: NodeKey,
        #[source]
        source: RoutingError,
    },

    #[error("node '{node}' failed: {source}")]
    NodeExecution {
        node: NodeKey,
        #[source]
        source: NodeError,
    },

    #[error("run cancelled before '{at}'")]
    Cancelled { at: NodeKey },

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: usize },
}

/// A failed run with the state as of the failure
#[derive(Debug, Error)]
#[error("graph '{graph}' failed at '{node}': {error}")]
pub struct RunFailure {
    pub graph: String,
    pub node: NodeKey,
    #[source]
    pub error: EngineError,
    pub state: Box<TeamState>,
}

impl RunFailure {
    pub fn is_routing(&self) -> bool {
        matches!(self.error, EngineError::Routing { .. })
    }
}
