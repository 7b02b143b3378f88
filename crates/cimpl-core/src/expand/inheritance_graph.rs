//! Inheritance graph over element definitions
//!
//! Nodes are element identifiers and every edge points from a child to one of
//! its bases. The graph serves two purposes during expansion:
//!
//! - reporting `basedOn` cycles once, up front, instead of rediscovering them
//!   during recursive expansion
//! - ordering the provenance pass so that every base is finished before any
//!   of its descendants
//!
//! # Example
//!
//! ```
//! use cimpl_core::expand::InheritanceGraph;
//! use cimpl_core::model::Identifier;
//!
//! let base = Identifier::new("shr.test", "Observation");
//! let child = Identifier::new("shr.test", "BodyWeight");
//!
//! let mut graph = InheritanceGraph::new();
//! graph.add_based_on(&child, &base);
//!
//! assert_eq!(graph.processing_order(), vec![base, child]);
//! ```

use crate::model::{DataElementRegistry, Identifier};
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::{debug, trace};

pub struct InheritanceGraph {
    /// Directed graph (node = element, edge = child -> base)
    graph: DiGraph<Identifier, ()>,
    node_map: HashMap<Identifier, NodeIndex>,
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the graph for every element of a registry
    ///
    /// TBD bases contribute no edge. Bases missing from the registry still
    /// become nodes so that lookups stay total.
    pub fn from_registry(registry: &DataElementRegistry) -> Self {
        let mut graph = Self::new();
        for identifier in registry.identifiers() {
            graph.add_node(identifier);
        }
        for element in registry.all() {
            for base in element.concrete_bases() {
                graph.add_based_on(&element.identifier, base);
            }
        }
        debug!(
            "Built inheritance graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Add a node, returning the existing index when already present
    pub fn add_node(&mut self, identifier: &Identifier) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(identifier) {
            return idx;
        }
        let idx = self.graph.add_node(identifier.clone());
        self.node_map.insert(identifier.clone(), idx);
        idx
    }

    pub fn add_based_on(&mut self, child: &Identifier, base: &Identifier) {
        let child_idx = self.add_node(child);
        let base_idx = self.add_node(base);
        trace!("{} based on {}", child, base);
        self.graph.add_edge(child_idx, base_idx, ());
    }

    /// Whether `child` inherits, directly or transitively, from `ancestor`
    pub fn inherits_from(&self, child: &Identifier, ancestor: &Identifier) -> bool {
        match (self.node_map.get(child), self.node_map.get(ancestor)) {
            (Some(&from), Some(&to)) => from != to && has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Every inheritance cycle, each closed by repeating its first element
    pub fn find_cycles(&self) -> Vec<Vec<Identifier>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || (scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]))
            })
            .map(|mut scc| {
                scc.sort();
                let mut cycle: Vec<Identifier> =
                    scc.iter().map(|&idx| self.graph[idx].clone()).collect();
                if let Some(first) = cycle.first().cloned() {
                    cycle.push(first);
                }
                cycle
            })
            .collect()
    }

    /// All elements, bases before descendants; members of a cycle are
    /// grouped together in insertion order
    pub fn processing_order(&self) -> Vec<Identifier> {
        tarjan_scc(&self.graph)
            .into_iter()
            .flat_map(|mut scc| {
                scc.sort();
                scc.into_iter().map(|idx| self.graph[idx].clone())
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for InheritanceGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a cycle as `A -> B -> A`
pub fn format_cycle(cycle: &[Identifier]) -> String {
    cycle
        .iter()
        .map(Identifier::fqn)
        .collect::<Vec<_>>()
        .join(" -> ")
}
