// SPDX-License-Identifier: MIT

//! Run entry point

use crate::graph::{CompiledGraph, RunFailure, RunOptions, RunToggles, TeamState};

/// Run `graph` on a fresh state built from `task`
pub async fn start_run(
    graph: &CompiledGraph,
    task: &str,
    toggles: RunToggles,
) -> Result<TeamState, RunFailure> {
    start_run_with(graph, task, toggles, &RunOptions::default()).await
}

/// [`start_run`] with caller-side limits, cancellation and progress events
pub async fn start_run_with(
    graph: &CompiledGraph,
    task: &str,
    toggles: RunToggles,
    options: &RunOptions,
) -> Result<TeamState, RunFailure> {
    log::info!("Run started on '{}': {}", graph.name(), task);
    let initial = TeamState::new(task).with_toggles(toggles);
    graph.run(initial, options).await
}
