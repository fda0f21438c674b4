//! Deployment-unit dependency graph (Arc<str> optimized)
//!
//! Uses Arc<str> for zero-cost cloning of unit names. An edge A -> B means
//! B imports a value exported by A, so A must deploy first.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::StrataError;

/// Directed graph over deployment units
#[derive(Debug, Default)]
pub struct UnitGraph {
    /// unit -> list of dependent units (importers)
    adjacency: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// unit -> list of units it imports from
    predecessors: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// All unit names (insertion order, for iteration)
    names: Vec<Arc<str>>,
    /// Quick lookup for Arc reuse
    index: HashSet<Arc<str>>,
}

impl UnitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> Arc<str> {
        if let Some(existing) = self.index.get(name) {
            return Arc::clone(existing);
        }
        let name: Arc<str> = Arc::from(name);
        self.index.insert(Arc::clone(&name));
        self.names.push(Arc::clone(&name));
        self.adjacency.insert(Arc::clone(&name), Vec::new());
        self.predecessors.insert(Arc::clone(&name), Vec::new());
        name
    }

    /// Register a unit even if nothing references it
    pub fn add_node(&mut self, name: &str) {
        self.intern(name);
    }

    /// Record that `to` depends on a value exported by `from`.
    /// Parallel edges collapse to one.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.intern(from);
        let to = self.intern(to);

        let successors = self
            .adjacency
            .entry(Arc::clone(&from))
            .or_default();
        if successors.iter().any(|existing| *existing == to) {
            return;
        }
        successors.push(Arc::clone(&to));
        self.predecessors.entry(to).or_default().push(from);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Edge set as (exporting unit, importing unit) pairs, sorted
    pub fn edges(&self) -> Vec<(Arc<str>, Arc<str>)> {
        let mut edges: Vec<(Arc<str>, Arc<str>)> = self
            .adjacency
            .iter()
            .flat_map(|(from, successors)| {
                successors
                    .iter()
                    .map(move |to| (Arc::clone(from), Arc::clone(to)))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Check if there's a path from `from` to `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = self.adjacency.get(current) {
                for neighbor in neighbors {
                    if neighbor.as_ref() == to {
                        return true;
                    }
                    if visited.insert(neighbor.as_ref()) {
                        queue.push_back(neighbor.as_ref());
                    }
                }
            }
        }

        false
    }

    /// Find one cycle, as the ordered unit sequence with the start repeated
    /// at the end (e.g. `["App", "Net", "App"]`). None if acyclic.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn visit(
            graph: &UnitGraph,
            node: &Arc<str>,
            colors: &mut HashMap<Arc<str>, Color>,
            stack: &mut Vec<Arc<str>>,
        ) -> Option<Vec<String>> {
            colors.insert(Arc::clone(node), Color::Gray);
            stack.push(Arc::clone(node));

            if let Some(successors) = graph.adjacency.get(node) {
                for next in successors {
                    match colors.get(next).copied().unwrap_or(Color::White) {
                        Color::Gray => {
                            let start = stack
                                .iter()
                                .position(|entry| entry == next)
                                .unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(next.to_string());
                            return Some(cycle);
                        }
                        Color::White => {
                            if let Some(cycle) = visit(graph, next, colors, stack) {
                                return Some(cycle);
                            }
                        }
                        Color::Black => {}
                    }
                }
            }

            stack.pop();
            colors.insert(Arc::clone(node), Color::Black);
            None
        }

        let mut colors: HashMap<Arc<str>, Color> = HashMap::new();
        let mut stack: Vec<Arc<str>> = Vec::new();
        for name in &self.names {
            if colors.get(name).copied().unwrap_or(Color::White) == Color::White {
                if let Some(cycle) = visit(self, name, &mut colors, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Topological order: units with no unresolved incoming dependency
    /// first, ties broken by unit name for determinism (Kahn's algorithm).
    pub fn topo_order(&self) -> Result<Vec<Arc<str>>, StrataError> {
        let mut indegree: HashMap<Arc<str>, usize> = self
            .names
            .iter()
            .map(|name| (Arc::clone(name), 0))
            .collect();
        for (name, predecessors) in &self.predecessors {
            if let Some(count) = indegree.get_mut(name) {
                *count = predecessors.len();
            }
        }

        let mut ready: BTreeSet<Arc<str>> = indegree
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(name, _)| Arc::clone(name))
            .collect();

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(next) = ready.iter().next().cloned() {
            ready.remove(&next);
            order.push(Arc::clone(&next));

            if let Some(successors) = self.adjacency.get(&next) {
                for successor in successors {
                    if let Some(count) = indegree.get_mut(successor) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(Arc::clone(successor));
                        }
                    }
                }
            }
        }

        if order.len() < self.names.len() {
            let cycle = self.detect_cycle().unwrap_or_default();
            return Err(StrataError::CircularDependency { cycle });
        }
        Ok(order)
    }
}
