use itertools::Itertools;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::error::{JoinerError, JoinerResult};
use crate::query::{Binding, Comparison, JoinPredicate, QueryInfo};

/// Whether `predicate` can join two bindings with a hash join.
pub fn is_join_edge(predicate: &JoinPredicate) -> bool {
    predicate.comparison == Comparison::Equal && predicate.left.binding != predicate.right.binding
}

/// Undirected graph with one node per binding and one edge per equality between two different
/// bindings.
#[derive(Debug)]
pub struct QueryGraph {
    graph: UnGraph<Binding, JoinPredicate>,
}

impl QueryGraph {
    pub fn from_query(query: &QueryInfo) -> Self {
        let mut graph = UnGraph::with_capacity(query.relation_ids().len(), query.predicates().len());
        for binding in 0..query.relation_ids().len() {
            graph.add_node(binding);
        }
        for predicate in query.predicates() {
            if is_join_edge(predicate) {
                graph.add_edge(
                    NodeIndex::new(predicate.left.binding),
                    NodeIndex::new(predicate.right.binding),
                    *predicate,
                );
            }
        }
        Self { graph }
    }

    pub fn is_connected(&self) -> bool {
        connected_components(&self.graph) <= 1
    }

    /// Bindings grouped by connected component, each group and the list sorted.
    pub fn components(&self) -> Vec<Vec<Binding>> {
        let mut sets = UnionFind::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }
        self.graph
            .node_indices()
            .map(|n| (sets.find(n.index()), self.graph[n]))
            .into_group_map()
            .into_values()
            .map(|bindings| bindings.into_iter().sorted().collect_vec())
            .sorted()
            .collect()
    }

    pub fn check_connected(&self) -> JoinerResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(JoinerError::DisconnectedQueryGraph {
                components: self.components(),
            })
        }
    }
}
