//! Named dependency edges between feedbacks.
//!
//! Derived feedbacks declare which upstream feedbacks they read. When an
//! upstream changes, [`FeedbackGraph::propagate`] fires every transitive
//! dependent exactly once, upstream before downstream, before returning.

use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::error::{FabricError, Result};

type FireFn = Arc<dyn Fn() -> bool + Send + Sync>;

struct GraphNode {
    name: String,
    /// None for upstream inputs that are fired elsewhere
    fire: Option<FireFn>,
}

#[derive(Default)]
struct GraphInner {
    nodes: Vec<GraphNode>,
    /// (upstream, downstream) node indices
    edges: Vec<(usize, usize)>,
}

impl GraphInner {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    fn downstream_of(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(up, _)| *up == node)
            .map(|(_, down)| *down)
    }

    fn reachable_from(&self, start: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.downstream_of(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Kahn's algorithm restricted to `subset`; ties resolved by
    /// registration order.
    fn ordered(&self, subset: &HashSet<usize>) -> Vec<usize> {
        let mut in_degree: Vec<usize> = vec![0; self.nodes.len()];
        for (up, down) in &self.edges {
            if subset.contains(up) && subset.contains(down) {
                in_degree[*down] += 1;
            }
        }

        let mut ready: Vec<usize> = subset
            .iter()
            .copied()
            .filter(|n| in_degree[*n] == 0)
            .collect();
        ready.sort_unstable_by(|a, b| b.cmp(a));

        let mut order = Vec::with_capacity(subset.len());
        while let Some(node) = ready.pop() {
            order.push(node);
            for next in self.downstream_of(node) {
                if !subset.contains(&next) {
                    continue;
                }
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                    ready.sort_unstable_by(|a, b| b.cmp(a));
                }
            }
        }
        order
    }
}

#[derive(Default)]
pub struct FeedbackGraph {
    inner: RwLock<GraphInner>,
}

impl FeedbackGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an upstream node. Its feedback is fired by its owner; the
    /// graph only propagates from it.
    pub fn add_source(&self, name: &str) {
        self.add_node(name, None);
    }

    /// Register a derived node with the function that re-evaluates it
    pub fn add_derived(&self, name: &str, fire: impl Fn() -> bool + Send + Sync + 'static) {
        self.add_node(name, Some(Arc::new(fire)));
    }

    fn add_node(&self, name: &str, fire: Option<FireFn>) {
        let mut inner = self.inner.write();
        if inner.index_of(name).is_some() {
            log::warn!("Feedback node '{}' already registered, ignoring", name);
            return;
        }
        inner.nodes.push(GraphNode {
            name: name.to_string(),
            fire,
        });
    }

    /// Declare that `downstream` reads `upstream`.
    pub fn depend(&self, downstream: &str, upstream: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let down = inner
            .index_of(downstream)
            .ok_or_else(|| FabricError::UnknownFeedbackNode(downstream.to_string()))?;
        let up = inner
            .index_of(upstream)
            .ok_or_else(|| FabricError::UnknownFeedbackNode(upstream.to_string()))?;

        if up == down || inner.reachable_from(down).contains(&up) {
            return Err(FabricError::FeedbackCycle {
                downstream: downstream.to_string(),
                upstream: upstream.to_string(),
            });
        }
        if !inner.edges.contains(&(up, down)) {
            inner.edges.push((up, down));
        }
        Ok(())
    }

    /// Names of every node that transitively reads `name`, in firing order
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let inner = self.inner.read();
        let Some(start) = inner.index_of(name) else {
            return Vec::new();
        };
        let subset = inner.reachable_from(start);
        inner
            .ordered(&subset)
            .into_iter()
            .map(|i| inner.nodes[i].name.clone())
            .collect()
    }

    /// Fire every transitive dependent of `name` in dependency order.
    ///
    /// Returns the names of the nodes fired. Each node reads the current
    /// value of its upstreams because they were fired earlier in this pass.
    pub fn propagate(&self, name: &str) -> Vec<String> {
        let plan: Vec<(String, Option<FireFn>)> = {
            let inner = self.inner.read();
            let Some(start) = inner.index_of(name) else {
                log::warn!("Propagate from unknown feedback node '{}'", name);
                return Vec::new();
            };
            let subset = inner.reachable_from(start);
            inner
                .ordered(&subset)
                .into_iter()
                .map(|i| (inner.nodes[i].name.clone(), inner.nodes[i].fire.clone()))
                .collect()
        };

        let mut fired = Vec::with_capacity(plan.len());
        for (node, fire) in plan {
            if let Some(fire) = fire {
                let changed = fire();
                log::trace!("Feedback '{}' re-evaluated (changed: {})", node, changed);
            }
            fired.push(node);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_graph(log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<FeedbackGraph> {
        let graph = FeedbackGraph::new();
        graph.add_source("raw");
        for name in ["name", "id"] {
            let log = log.clone();
            graph.add_derived(name, move || {
                log.lock().push(name);
                true
            });
        }
        graph
    }

    #[test]
    fn test_dependency_order_not_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = recording_graph(&log);
        graph.depend("id", "raw").unwrap();
        graph.depend("name", "raw").unwrap();
        graph.depend("name", "id").unwrap();

        let fired = graph.propagate("raw");
        assert_eq!(fired, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(*log.lock(), vec!["id", "name"]);
    }

    #[test]
    fn test_each_dependent_fired_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = recording_graph(&log);
        graph.depend("id", "raw").unwrap();
        graph.depend("name", "raw").unwrap();
        graph.depend("name", "id").unwrap();
        graph.propagate("raw");
        graph.propagate("id");
        assert_eq!(*log.lock(), vec!["id", "name", "name"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = recording_graph(&log);
        graph.depend("name", "id").unwrap();
        let err = graph.depend("id", "name").unwrap_err();
        assert!(matches!(err, FabricError::FeedbackCycle { .. }));
        assert!(graph.depend("id", "id").is_err());
    }

    #[test]
    fn test_unknown_nodes() {
        let graph = FeedbackGraph::new();
        graph.add_source("raw");
        assert!(matches!(
            graph.depend("missing", "raw"),
            Err(FabricError::UnknownFeedbackNode(_))
        ));
        assert!(graph.propagate("missing").is_empty());
        assert!(graph.dependents("missing").is_empty());
    }

    #[test]
    fn test_unrelated_nodes_not_fired() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = recording_graph(&log);
        graph.add_source("other");
        graph.depend("id", "other").unwrap();
        graph.propagate("raw");
        assert!(log.lock().is_empty());
        assert_eq!(graph.dependents("other"), vec!["id".to_string()]);
    }
}
