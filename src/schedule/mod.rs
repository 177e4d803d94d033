//! Dependency ordering for graph nodes.
//!
//! A small directed graph with topological ordering via Kahn's algorithm.
//! Node payloads are generic so the same machinery orders task groups today
//! and whatever else needs ordering tomorrow. The produced order is
//! deterministic for a fixed sequence of `add_node`/`add_edge` calls: ties are
//! broken by insertion order, nothing else.

use std::collections::VecDeque;
use std::fmt;

/// Error returned when the graph contains at least one dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Indices of nodes that could not be ordered. Every cycle member is in
    /// this list, along with nodes downstream of a cycle.
    pub involved: Vec<usize>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dependency cycle involving {} node(s)",
            self.involved.len()
        )
    }
}

impl std::error::Error for CycleError {}

/// Directed dependency graph over nodes of type `T`.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<T>,
    /// `edges[i]` lists the nodes that must come after node `i`.
    edges: Vec<Vec<usize>>,
    in_degrees: Vec<usize>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            in_degrees: Vec::new(),
        }
    }
}

impl<T> DependencyGraph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self, node: T) -> usize {
        self.nodes.push(node);
        self.edges.push(Vec::new());
        self.in_degrees.push(0);
        self.nodes.len() - 1
    }

    /// Add an edge stating that `before` must be ordered ahead of `after`.
    /// Adding the same edge twice is a no-op. Self edges are authoring
    /// errors and panic.
    pub fn add_edge(&mut self, before: usize, after: usize) {
        assert_ne!(before, after, "node {before} cannot depend on itself");
        assert!(before < self.nodes.len(), "unknown node index {before}");
        assert!(after < self.nodes.len(), "unknown node index {after}");
        if self.edges[before].contains(&after) {
            return;
        }
        self.edges[before].push(after);
        self.in_degrees[after] += 1;
    }

    /// Access a node by index.
    pub fn node(&self, index: usize) -> &T {
        &self.nodes[index]
    }

    /// Mutably access a node by index.
    pub fn node_mut(&mut self, index: usize) -> &mut T {
        &mut self.nodes[index]
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[T] {
        &self.nodes
    }

    /// All nodes in insertion order, mutably.
    pub fn nodes_mut(&mut self) -> &mut [T] {
        &mut self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compute a topological order of all node indices.
    ///
    /// Fails with [`CycleError`] when the edges contain a cycle, naming the
    /// nodes that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<usize>, CycleError> {
        let mut in_degrees = self.in_degrees.clone();
        let mut queue: VecDeque<usize> = in_degrees
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(index, _)| index)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(index) = queue.pop_front() {
            order.push(index);
            for &next in &self.edges[index] {
                in_degrees[next] -= 1;
                if in_degrees[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let involved = in_degrees
                .iter()
                .enumerate()
                .filter(|(_, &degree)| degree > 0)
                .map(|(index, _)| index)
                .collect();
            return Err(CycleError { involved });
        }
        Ok(order)
    }
}
