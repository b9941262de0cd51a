use ndarray::Array2;
use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::mds;
use crate::error::ProjectionError;

/// Isomap: classical MDS over geodesic distances, measured as shortest
/// paths through the `neighbors`-nearest-neighbour graph.
pub fn fit(
    distances: &Array2<f64>,
    dims: usize,
    neighbors: usize,
    seed: u64,
) -> Result<Array2<f64>, ProjectionError> {
    let n = distances.nrows();
    let graph = neighbor_graph(distances, neighbors);

    let components = connected_components(&graph);
    if components > 1 {
        return Err(ProjectionError::DisconnectedGraph {
            components,
            neighbors,
        });
    }

    let mut geodesic = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let lengths = dijkstra(&graph, NodeIndex::new(i), None, |e| *e.weight());
        for (node, length) in lengths {
            geodesic[[i, node.index()]] = length;
        }
    }
    // Paths found from either end can differ in the last bits.
    let geodesic = (&geodesic + &geodesic.t()) / 2.0;

    Ok(mds::fit(&geodesic, dims, false, seed))
}

/// Undirected graph joining every point to its `k` nearest others.
fn neighbor_graph(distances: &Array2<f64>, k: usize) -> UnGraph<(), f64> {
    let n = distances.nrows();
    let mut graph = UnGraph::<(), f64>::with_capacity(n, n * k);
    let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();

    for i in 0..n {
        let mut others: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        others.sort_by(|&a, &b| distances[[i, a]].total_cmp(&distances[[i, b]]));
        for &j in others.iter().take(k) {
            graph.update_edge(nodes[i], nodes[j], distances[[i, j]]);
        }
    }
    graph
}
