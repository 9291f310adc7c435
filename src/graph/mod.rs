// SPDX-License-Identifier: MIT

//! State graph: build, compile and run worker graphs

pub mod builder;
pub mod edge;
pub mod error;
pub mod executor;
pub mod node;
pub mod state;
pub mod types;

pub use builder::{CompiledGraph, GraphBuilder};
pub use edge::{branches, ConditionalEdge, DecideFn, Edge};
pub use error::{EngineError, GraphDefinitionError, NodeError, RoutingError, RunFailure};
pub use executor::{GraphEvent, RunContext, RunOptions};
pub use node::{FnNode, Node, SubgraphNode};
pub use state::{ReducerType, RunToggles, StateField, StatePatch, TeamState, Verdict};
pub use types::{NodeKey, Target, FINISH};
