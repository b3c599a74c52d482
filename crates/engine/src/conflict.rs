use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::model::Flight;

/// Undirected overlap graph over a flight slice.
///
/// Node `i` is `flights[i]`; an edge joins every pair whose `[start, end)`
/// windows overlap. Built from scratch for each scheduling call.
#[derive(Debug, Clone)]
pub struct ConflictGraph {
    graph: UnGraph<usize, ()>,
}

impl ConflictGraph {
    /// Checks all `n * (n - 1) / 2` pairs.
    pub fn build(flights: &[Flight]) -> Self {
        let n = flights.len();
        let mut graph: UnGraph<usize, ()> = UnGraph::with_capacity(n, n);
        let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();

        for i in 0..n {
            for j in (i + 1)..n {
                if flights[i].overlaps(&flights[j]) {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }

        ConflictGraph { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of flights conflicting with flight `i`.
    pub fn degree(&self, i: usize) -> usize {
        self.graph.neighbors(NodeIndex::new(i)).count()
    }

    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(i))
            .map(|n| self.graph[n])
    }

    /// Neighbors of `i` in ascending index order.
    pub fn conflicts_of(&self, i: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.neighbors(i).collect();
        out.sort_unstable();
        out
    }

    /// `(index, degree)` of the most conflicted flight; the first one wins ties.
    pub fn max_degree(&self) -> Option<(usize, usize)> {
        (0..self.node_count()).fold(None, |best, i| {
            let d = self.degree(i);
            match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            }
        })
    }

    /// Every edge once, as `(lower index, higher index)`, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| {
                let a = self.graph[e.source()];
                let b = self.graph[e.target()];
                (a.min(b), a.max(b))
            })
            .collect();
        out.sort_unstable();
        out
    }

    pub fn adjacency_matrix(&self) -> Vec<Vec<bool>> {
        let n = self.node_count();
        let mut matrix = vec![vec![false; n]; n];
        for (a, b) in self.edges() {
            matrix[a][b] = true;
            matrix[b][a] = true;
        }
        matrix
    }
}
