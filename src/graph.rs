//! Follow-graph adjacency index.
//!
//! [`build_index`] turns the flat node/edge lists of a [`Graph`] into a
//! mapping from each node to its followees. Every node gets an entry, so
//! "no entry" and "follows nobody" are the same thing to callers.
//!
//! [`MemoizedIndex`] caches the index against the identity of the shared
//! `Arc<Graph>` it was built from and rebuilds only when a different graph
//! is handed in.

use crate::model::{Graph, GraphNode, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Node id → followee ids, in edge input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdjacencyIndex {
    followees: HashMap<UserId, Vec<UserId>>,
}

impl AdjacencyIndex {
    /// Followees of `id`. Unknown ids and isolated nodes both yield `&[]`.
    #[must_use]
    pub fn followees(&self, id: UserId) -> &[UserId] {
        self.followees.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Whether `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: UserId) -> bool {
        self.followees.contains_key(&id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.followees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.followees.is_empty()
    }

    /// Total number of edges recorded.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.followees.values().map(Vec::len).sum()
    }

    /// Iterate entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (UserId, &[UserId])> {
        self.followees.iter().map(|(id, list)| (*id, list.as_slice()))
    }
}

/// Build the adjacency index of `graph` in O(|nodes| + |edges|).
///
/// Every node gets an (initially empty) entry; each edge `(s, t)` then
/// appends `t` to `s`'s list. An edge whose source is not a node still gets
/// an entry for that source.
#[must_use]
pub fn build_index(graph: &Graph) -> AdjacencyIndex {
    let mut followees: HashMap<UserId, Vec<UserId>> =
        HashMap::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        followees.entry(node.id).or_default();
    }
    for edge in &graph.edges {
        followees.entry(edge.source).or_default().push(edge.target);
    }

    AdjacencyIndex { followees }
}

/// Caches an [`AdjacencyIndex`] against the `Arc<Graph>` it was built from.
#[derive(Debug, Default)]
pub struct MemoizedIndex {
    cached: Option<(Arc<Graph>, Arc<AdjacencyIndex>)>,
    builds: usize,
}

impl MemoizedIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `graph`, rebuilt only if `graph` is a different allocation
    /// than the one last seen.
    pub fn get(&mut self, graph: &Arc<Graph>) -> Arc<AdjacencyIndex> {
        if let Some((source, index)) = &self.cached {
            if Arc::ptr_eq(source, graph) {
                return Arc::clone(index);
            }
        }

        let index = Arc::new(build_index(graph));
        self.builds += 1;
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            builds = self.builds,
            "Rebuilt adjacency index"
        );
        self.cached = Some((Arc::clone(graph), Arc::clone(&index)));
        index
    }

    /// How many times the index has been built.
    #[must_use]
    pub const fn build_count(&self) -> usize {
        self.builds
    }
}

/// A node with its followees resolved to handles, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphRow {
    pub node: GraphNode,
    pub follows: Vec<String>,
}

/// Resolve every node's followees to handles, in node order.
///
/// Followee ids with no matching node are skipped.
#[must_use]
pub fn graph_rows(graph: &Graph, index: &AdjacencyIndex) -> Vec<GraphRow> {
    let handles: HashMap<UserId, &str> = graph
        .nodes
        .iter()
        .map(|n| (n.id, n.handle.as_str()))
        .collect();

    graph
        .nodes
        .iter()
        .map(|node| GraphRow {
            node: node.clone(),
            follows: index
                .followees(node.id)
                .iter()
                .filter_map(|id| handles.get(id).map(|h| (*h).to_string()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphEdge;
    use proptest::prelude::*;

    fn node(id: UserId, handle: &str) -> GraphNode {
        GraphNode {
            id,
            handle: handle.to_string(),
            persona_type: "casual".to_string(),
        }
    }

    fn sample() -> Graph {
        Graph {
            nodes: vec![node(1, "ada"), node(2, "bob"), node(3, "cy"), node(4, "dee")],
            edges: vec![
                GraphEdge { source: 1, target: 3 },
                GraphEdge { source: 1, target: 2 },
                GraphEdge { source: 2, target: 1 },
            ],
        }
    }

    #[test]
    fn isolated_nodes_have_empty_entries() {
        let index = build_index(&sample());
        assert!(index.contains(4));
        assert!(index.followees(4).is_empty());
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn edges_keep_input_order() {
        let index = build_index(&sample());
        assert_eq!(index.followees(1), &[3, 2]);
        assert_eq!(index.followees(2), &[1]);
        assert_eq!(index.edge_count(), 3);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let graph = sample();
        assert_eq!(build_index(&graph), build_index(&graph));
    }

    #[test]
    fn memoized_index_rebuilds_only_on_new_graph() {
        let mut memo = MemoizedIndex::new();
        let graph = Arc::new(sample());

        let first = memo.get(&graph);
        let second = memo.get(&Arc::clone(&graph));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(memo.build_count(), 1);

        let replaced = Arc::new(sample());
        let third = memo.get(&replaced);
        assert_eq!(memo.build_count(), 2);
        assert_eq!(*first, *third);
    }

    #[test]
    fn graph_rows_resolve_handles_and_skip_unknown_ids() {
        let mut graph = sample();
        graph.edges.push(GraphEdge { source: 3, target: 99 });
        let index = build_index(&graph);
        let rows = graph_rows(&graph, &index);
        assert_eq!(rows[0].follows, ["cy", "bob"]);
        assert!(rows[2].follows.is_empty());
        assert!(rows[3].follows.is_empty());
    }

    fn arb_graph() -> impl Strategy<Value = Graph> {
        proptest::collection::btree_set(0i64..40, 0..20).prop_flat_map(|ids| {
            let ids: Vec<i64> = ids.into_iter().collect();
            let n = ids.len();
            let edges = if n == 0 {
                Just(Vec::new()).boxed()
            } else {
                proptest::collection::vec((0..n, 0..n), 0..60)
                    .prop_map({
                        let ids = ids.clone();
                        move |pairs| {
                            pairs
                                .into_iter()
                                .map(|(s, t)| GraphEdge {
                                    source: ids[s],
                                    target: ids[t],
                                })
                                .collect()
                        }
                    })
                    .boxed()
            };
            let nodes: Vec<GraphNode> = ids
                .iter()
                .map(|id| node(*id, &format!("u{id}")))
                .collect();
            edges.prop_map(move |edges| Graph {
                nodes: nodes.clone(),
                edges,
            })
        })
    }

    proptest! {
        #[test]
        fn every_node_is_a_key_exactly_once(graph in arb_graph()) {
            let index = build_index(&graph);
            prop_assert_eq!(index.len(), graph.nodes.len());
            for node in &graph.nodes {
                prop_assert!(index.contains(node.id));
            }
            prop_assert_eq!(index.edge_count(), graph.edges.len());
            prop_assert_eq!(build_index(&graph), index);
        }
    }
}
