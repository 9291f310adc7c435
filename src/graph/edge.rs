// SPDX-License-Identifier: MIT

//! Outgoing edges

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::state::TeamState;
use super::types::Target;

/// Routing function of a conditional edge. `None` means no decision.
pub type DecideFn = Arc<dyn Fn(&TeamState) -> Option<Target> + Send + Sync>;

#[derive(Clone)]
pub enum Edge {
    Fixed(Target),
    Conditional(ConditionalEdge),
}

/// Decision function plus the table of labels it may return.
///
/// Each key is a label the decision function may produce; its value is where
/// that label actually leads (usually the same target).
#[derive(Clone)]
pub struct ConditionalEdge {
    pub decide: DecideFn,
    pub branches: BTreeMap<Target, Target>,
}

impl ConditionalEdge {
    pub fn new<F, I>(decide: F, branches: I) -> Self
    where
        F: Fn(&TeamState) -> Option<Target> + Send + Sync + 'static,
        I: IntoIterator<Item = (Target, Target)>,
    {
        Self {
            decide: Arc::new(decide),
            branches: branches.into_iter().collect(),
        }
    }

    pub fn options(&self) -> impl Iterator<Item = &Target> {
        self.branches.keys()
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Edge::Conditional(edge) => edge.fmt(f),
        }
    }
}

/// Identity branch table over `targets`
pub fn branches<I>(targets: I) -> BTreeMap<Target, Target>
where
    I: IntoIterator<Item = Target>,
{
    targets.into_iter().map(|t| (t.clone(), t)).collect()
}
