// SPDX-License-Identifier: MIT

//! Cadre - supervisor-routed worker teams compiled into a state graph
//!
//! A run threads one [`graph::TeamState`] through a compiled graph of nodes.
//! Supervisors ask a [`adk::model::Model`] which worker acts next, whole teams
//! can be embedded as single nodes, a planner/critic pair refines the plan in
//! a bounded loop, and a memory hook records skills or failure reflections
//! through a [`memory::LearningStore`] before the run terminates.

pub mod adk;
pub mod config;
pub mod graph;
pub mod memory;
pub mod run;
pub mod teams;
pub mod workers;
