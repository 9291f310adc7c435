// SPDX-License-Identifier: MIT

//! Ready-made graphs
//!
//! - [flat] - one supervisor over planner, web surfer and coder
//! - [research] / [coding] - the teams embedded by the hierarchical graph
//! - [hierarchical] - plan/critique loop, then a top supervisor over teams
//! - [loader] - flat teams declared in YAML

pub mod coding;
pub mod flat;
pub mod hierarchical;
pub mod loader;
pub mod research;

pub use coding::coding_team;
pub use flat::flat_team;
pub use hierarchical::{hierarchical, HierarchicalConfig};
pub use loader::{TeamDefinition, TeamLoader, WorkerDefinition};
pub use research::research_team;

use std::sync::Arc;

use crate::graph::{
    CompiledGraph, GraphBuilder, GraphDefinitionError, Node, NodeKey, Target,
};
use crate::workers::{supervisor_router, SupervisorNode};

/// Compile a supervisor with its members: every member reports back to the
/// supervisor, and FINISH leads to `finish_to`.
pub fn supervised_team(
    name: &str,
    supervisor: SupervisorNode,
    members: Vec<(NodeKey, Arc<dyn Node>)>,
    finish_to: Target,
) -> Result<CompiledGraph, GraphDefinitionError> {
    let supervisor_key = supervisor.key().clone();
    let mut routes = supervisor.route_table();
    routes.insert(Target::End, finish_to);

    let mut builder = GraphBuilder::new(name)
        .add_node(supervisor_key.clone(), supervisor)
        .add_conditional_edges(supervisor_key.clone(), supervisor_router, routes)
        .set_entry_point(supervisor_key.clone());

    for (key, node) in members {
        builder = builder
            .add_shared_node(key.clone(), node)
            .add_edge(key, supervisor_key.clone());
    }

    builder.compile()
}
