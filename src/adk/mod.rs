// SPDX-License-Identifier: MIT

//! Agent development kit - the inference side of cadre
//!
//! - [model] - the `Model` trait, conversation messages and the OpenAI-compatible adapter
//! - [structured] - schema-constrained completions with a parse-from-text fallback
//! - [error] - top-level and model error types

pub mod error;
pub mod model;
pub mod structured;
