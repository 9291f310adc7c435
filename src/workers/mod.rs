// SPDX-License-Identifier: MIT

//! Built-in nodes: supervisors, the planning loop, workers and the memory hook

pub mod adhoc;
pub mod critic;
pub mod memory_hook;
pub mod persona;
pub mod planner;
pub mod supervisor;

pub use adhoc::AdHocWorker;
pub use critic::{critique_edge, CriticNode, CritiqueVerdict};
pub use memory_hook::MemoryHook;
pub use persona::PersonaWorker;
pub use planner::PlannerNode;
pub use supervisor::{supervisor_router, RouteDecision, SupervisorNode};
