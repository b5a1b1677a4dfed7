//! Task dependency graph
//!
//! A [`TaskGraph`] is plain data: a list of task ids and a list of
//! upstream → downstream edges. It knows nothing about how tasks run;
//! [`DagRunner`](super::DagRunner) consumes it.
//!
//! Example format:
//! ```yaml
//! nodes:
//!   - extract
//!   - load
//! edges:
//!   - upstream: extract
//!     downstream: load
//! ```

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Dependency edge: `downstream` may start only after `upstream` succeeded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub upstream: String,
    pub downstream: String,
}

impl Edge {
    pub fn new(upstream: impl Into<String>, downstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            downstream: downstream.into(),
        }
    }
}

/// Directed acyclic graph of task ids
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskGraph {
    /// Task ids in declaration order
    pub nodes: Vec<String>,
    /// Dependency edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl TaskGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the graph
    ///
    /// Returns true if the task was added, false if it already exists
    pub fn add_node(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            false
        } else {
            self.nodes.push(id);
            true
        }
    }

    /// Add a dependency edge, adding missing endpoints as nodes
    pub fn add_edge(&mut self, upstream: impl Into<String>, downstream: impl Into<String>) {
        let edge = Edge::new(upstream, downstream);
        self.add_node(edge.upstream.clone());
        self.add_node(edge.downstream.clone());
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Make every task in `downstream` depend on `upstream`
    pub fn fan_out(&mut self, upstream: &str, downstream: &[&str]) {
        for task in downstream {
            self.add_edge(upstream, *task);
        }
    }

    /// Check if a task id is in the graph
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    /// Direct upstream dependencies of a task
    pub fn upstream(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.downstream == id)
            .map(|e| e.upstream.as_str())
            .collect()
    }

    /// Direct downstream dependents of a task
    pub fn downstream(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.upstream == id)
            .map(|e| e.downstream.as_str())
            .collect()
    }

    /// Check the graph is a well-formed DAG
    ///
    /// # Errors
    /// Returns an error on empty or duplicate task ids, edges that
    /// reference unknown tasks, self-loops, or cycles.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.trim().is_empty() {
                eyre::bail!("Task graph contains an empty task id");
            }
            if !seen.insert(node.as_str()) {
                eyre::bail!("Duplicate task id in graph: {}", node);
            }
        }

        for edge in &self.edges {
            for end in [&edge.upstream, &edge.downstream] {
                if !seen.contains(end.as_str()) {
                    eyre::bail!(
                        "Edge {} -> {} references unknown task '{}'",
                        edge.upstream,
                        edge.downstream,
                        end
                    );
                }
            }
            if edge.upstream == edge.downstream {
                eyre::bail!("Task '{}' depends on itself", edge.upstream);
            }
        }

        self.stages().map(|_| ())
    }

    /// Group tasks into topological layers
    ///
    /// Every task in a layer depends only on tasks in earlier layers, so the
    /// tasks within one layer may run concurrently. Tasks keep their
    /// declaration order inside a layer.
    ///
    /// # Errors
    /// Returns an error if the graph contains a cycle.
    pub fn stages(&self) -> Result<Vec<Vec<String>>> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        for edge in &self.edges {
            *in_degree.entry(edge.downstream.as_str()).or_insert(0) += 1;
        }

        let mut remaining: Vec<&str> = self.nodes.iter().map(|n| n.as_str()).collect();
        let mut stages = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
                .collect();

            if ready.is_empty() {
                eyre::bail!("Task graph contains a cycle among: {}", remaining.join(", "));
            }

            for node in &ready {
                for next in self.downstream(node) {
                    if let Some(degree) = in_degree.get_mut(next) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }

            remaining.retain(|n| !ready.contains(n));
            stages.push(ready.into_iter().map(String::from).collect());
        }

        Ok(stages)
    }
}
