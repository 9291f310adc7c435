// SPDX-License-Identifier: MIT

//! Graph builder and compiler
//!
//! Nodes and edges are collected without eager validation; `compile()`
//! checks the whole definition and resolves every successor to an index so
//! that routing at run time never looks a name up.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::sync::Arc;

use super::edge::{ConditionalEdge, DecideFn, Edge};
use super::error::GraphDefinitionError;
use super::node::Node;
use super::state::TeamState;
use super::types::{NodeKey, Target};

/// Resolved successor of a compiled node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    Node(usize),
    End,
}

pub(crate) enum CompiledEdge {
    Fixed(Resolved),
    Conditional {
        decide: DecideFn,
        branches: BTreeMap<Target, Resolved>,
    },
}

/// Node ready for execution
pub(crate) struct CompiledNode {
    pub(crate) key: NodeKey,
    pub(crate) node: Arc<dyn Node>,
    pub(crate) edge: CompiledEdge,
}

/// Immutable, validated graph. Share it behind an `Arc`.
pub struct CompiledGraph {
    pub(crate) name: String,
    pub(crate) nodes: Vec<CompiledNode>,
    pub(crate) entry: usize,
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.name)
            .field("entry", self.entry())
            .field("nodes", &self.node_keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &NodeKey {
        &self.nodes[self.entry].key
    }

    pub fn node_keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.iter().map(|n| &n.key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.iter().any(|n| &n.key == key)
    }

    /// Labels a node's edge accepts, with where each leads
    pub fn successors(&self, key: &NodeKey) -> Option<Vec<(Target, Target)>> {
        let node = self.nodes.iter().find(|n| &n.key == key)?;
        let out = match &node.edge {
            CompiledEdge::Fixed(to) => {
                let to = self.target_of(*to);
                vec![(to.clone(), to)]
            }
            CompiledEdge::Conditional { branches, .. } => branches
                .iter()
                .map(|(label, to)| (label.clone(), self.target_of(*to)))
                .collect(),
        };
        Some(out)
    }

    pub(crate) fn target_of(&self, resolved: Resolved) -> Target {
        match resolved {
            Resolved::Node(i) => Target::Node(self.nodes[i].key.clone()),
            Resolved::End => Target::End,
        }
    }

    /// Human-readable topology, one line per node
    pub fn describe(&self) -> String {
        let mut out = format!("graph {} (entry: {})\n", self.name, self.entry());
        for node in &self.nodes {
            match &node.edge {
                CompiledEdge::Fixed(to) => {
                    let _ = writeln!(out, "  {} -> {}", node.key, self.target_of(*to));
                }
                CompiledEdge::Conditional { branches, .. } => {
                    let options: Vec<String> = branches
                        .iter()
                        .map(|(label, to)| {
                            let to = self.target_of(*to);
                            if *label == to {
                                label.to_string()
                            } else {
                                format!("{} => {}", label, to)
                            }
                        })
                        .collect();
                    let _ = writeln!(out, "  {} -> [{}]", node.key, options.join(", "));
                }
            }
        }
        out
    }
}

/// Builder for a [`CompiledGraph`]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<(NodeKey, Arc<dyn Node>)>,
    edges: Vec<(NodeKey, Edge)>,
    entry: Option<NodeKey>,
    errors: Vec<GraphDefinitionError>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
            errors: Vec::new(),
        }
    }

    pub fn add_node(self, key: NodeKey, node: impl Node + 'static) -> Self {
        self.add_shared_node(key, Arc::new(node))
    }

    pub fn add_shared_node(mut self, key: NodeKey, node: Arc<dyn Node>) -> Self {
        if self.nodes.iter().any(|(k, _)| k == &key) {
            self.errors.push(GraphDefinitionError::DuplicateNode(key));
        } else {
            self.nodes.push((key, node));
        }
        self
    }

    pub fn add_edge(self, from: NodeKey, to: impl Into<Target>) -> Self {
        self.push_edge(from, Edge::Fixed(to.into()))
    }

    /// Route out of `from` by `decide`; each branch maps a label to its target
    pub fn add_conditional_edges<F, I>(self, from: NodeKey, decide: F, branches: I) -> Self
    where
        F: Fn(&TeamState) -> Option<Target> + Send + Sync + 'static,
        I: IntoIterator<Item = (Target, Target)>,
    {
        self.push_edge(from, Edge::Conditional(ConditionalEdge::new(decide, branches)))
    }

    pub fn add_conditional_edge(self, from: NodeKey, edge: ConditionalEdge) -> Self {
        self.push_edge(from, Edge::Conditional(edge))
    }

    pub fn set_entry_point(mut self, key: NodeKey) -> Self {
        self.entry = Some(key);
        self
    }

    fn push_edge(mut self, from: NodeKey, edge: Edge) -> Self {
        if self.edges.iter().any(|(k, _)| k == &from) {
            self.errors.push(GraphDefinitionError::DuplicateEdge(from));
        } else {
            self.edges.push((from, edge));
        }
        self
    }

    pub fn compile(self) -> Result<CompiledGraph, GraphDefinitionError> {
        let GraphBuilder {
            name,
            nodes,
            edges,
            entry,
            errors,
        } = self;

        if let Some(first) = errors.into_iter().next() {
            return Err(first);
        }

        let index: HashMap<NodeKey, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();

        let entry = entry.ok_or(GraphDefinitionError::MissingEntry)?;
        let entry = *index
            .get(&entry)
            .ok_or_else(|| GraphDefinitionError::UnknownEntry(entry.clone()))?;

        let resolve = |from: &NodeKey, to: &Target| -> Result<Resolved, GraphDefinitionError> {
            match to {
                Target::End => Ok(Resolved::End),
                Target::Node(key) => index.get(key).map(|i| Resolved::Node(*i)).ok_or_else(|| {
                    GraphDefinitionError::UnknownSuccessor {
                        from: from.clone(),
                        to: key.clone(),
                    }
                }),
            }
        };

        let mut compiled_edges: HashMap<NodeKey, CompiledEdge> = HashMap::new();
        for (from, edge) in edges {
            if !index.contains_key(&from) {
                return Err(GraphDefinitionError::UnknownSource(from));
            }
            let compiled = match edge {
                Edge::Fixed(to) => CompiledEdge::Fixed(resolve(&from, &to)?),
                Edge::Conditional(cond) => {
                    if cond.branches.is_empty() {
                        return Err(GraphDefinitionError::EmptyBranches(from));
                    }
                    let mut branches = BTreeMap::new();
                    for (label, to) in cond.branches {
                        branches.insert(label, resolve(&from, &to)?);
                    }
                    CompiledEdge::Conditional {
                        decide: cond.decide,
                        branches,
                    }
                }
            };
            compiled_edges.insert(from, compiled);
        }

        let mut compiled_nodes = Vec::with_capacity(nodes.len());
        for (key, node) in nodes {
            let edge = compiled_edges
                .remove(&key)
                .ok_or_else(|| GraphDefinitionError::MissingEdge(key.clone()))?;
            compiled_nodes.push(CompiledNode { key, node, edge });
        }

        log::debug!(
            "Compiled graph '{}' with {} nodes",
            name,
            compiled_nodes.len()
        );

        Ok(CompiledGraph {
            name,
            nodes: compiled_nodes,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::branches;
    use crate::graph::node::FnNode;
    use crate::graph::state::StatePatch;

    fn noop() -> FnNode {
        FnNode::new(|_| Ok(StatePatch::new()))
    }

    fn route(state: &TeamState) -> Option<Target> {
        state.next.clone()
    }

    #[test]
    fn test_compile_simple_graph() {
        let graph = GraphBuilder::new("pair")
            .add_node(NodeKey::Planner, noop())
            .add_node(NodeKey::Critic, noop())
            .add_edge(NodeKey::Planner, NodeKey::Critic)
            .add_edge(NodeKey::Critic, Target::End)
            .set_entry_point(NodeKey::Planner)
            .compile()
            .unwrap();

        assert_eq!(graph.name(), "pair");
        assert_eq!(graph.entry(), &NodeKey::Planner);
        assert_eq!(
            format!("{:?}", graph),
            r#"CompiledGraph { name: "pair", entry: Planner, nodes: [Planner, Critic] }"#
        );
        assert_eq!(
            graph.successors(&NodeKey::Planner),
            Some(vec![(Target::node(NodeKey::Critic), Target::node(NodeKey::Critic))])
        );
        assert!(graph.describe().contains("Critic -> FINISH"));
    }

    #[test]
    fn test_unknown_conditional_option_rejected() {
        let err = GraphBuilder::new("bad")
            .add_node(NodeKey::Supervisor, noop())
            .add_conditional_edges(
                NodeKey::Supervisor,
                route,
                branches([Target::End, Target::node(NodeKey::Coder)]),
            )
            .set_entry_point(NodeKey::Supervisor)
            .compile()
            .err();

        assert_eq!(
            err,
            Some(GraphDefinitionError::UnknownSuccessor {
                from: NodeKey::Supervisor,
                to: NodeKey::Coder,
            })
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = GraphBuilder::new("dup")
            .add_node(NodeKey::Coder, noop())
            .add_node(NodeKey::Coder, noop())
            .add_edge(NodeKey::Coder, Target::End)
            .set_entry_point(NodeKey::Coder)
            .compile()
            .err();
        assert_eq!(err, Some(GraphDefinitionError::DuplicateNode(NodeKey::Coder)));
    }

    #[test]
    fn test_missing_and_unknown_entry() {
        let missing = GraphBuilder::new("g")
            .add_node(NodeKey::Coder, noop())
            .add_edge(NodeKey::Coder, Target::End)
            .compile()
            .err();
        assert_eq!(missing, Some(GraphDefinitionError::MissingEntry));

        let unknown = GraphBuilder::new("g")
            .add_node(NodeKey::Coder, noop())
            .add_edge(NodeKey::Coder, Target::End)
            .set_entry_point(NodeKey::Planner)
            .compile()
            .err();
        assert_eq!(unknown, Some(GraphDefinitionError::UnknownEntry(NodeKey::Planner)));
    }

    #[test]
    fn test_edge_problems() {
        let no_edge = GraphBuilder::new("g")
            .add_node(NodeKey::Coder, noop())
            .set_entry_point(NodeKey::Coder)
            .compile()
            .err();
        assert_eq!(no_edge, Some(GraphDefinitionError::MissingEdge(NodeKey::Coder)));

        let second = GraphBuilder::new("g")
            .add_node(NodeKey::Coder, noop())
            .add_edge(NodeKey::Coder, Target::End)
            .add_edge(NodeKey::Coder, Target::End)
            .set_entry_point(NodeKey::Coder)
            .compile()
            .err();
        assert_eq!(second, Some(GraphDefinitionError::DuplicateEdge(NodeKey::Coder)));

        let source = GraphBuilder::new("g")
            .add_node(NodeKey::Coder, noop())
            .add_edge(NodeKey::Coder, Target::End)
            .add_edge(NodeKey::Planner, NodeKey::Coder)
            .set_entry_point(NodeKey::Coder)
            .compile()
            .err();
        assert_eq!(source, Some(GraphDefinitionError::UnknownSource(NodeKey::Planner)));

        let empty = GraphBuilder::new("g")
            .add_node(NodeKey::Supervisor, noop())
            .add_conditional_edges(NodeKey::Supervisor, route, Vec::<(Target, Target)>::new())
            .set_entry_point(NodeKey::Supervisor)
            .compile()
            .err();
        assert_eq!(empty, Some(GraphDefinitionError::EmptyBranches(NodeKey::Supervisor)));
    }
}
