use std::collections::BTreeMap;
use tracing::debug;

use crate::graph::UndirectedView;

pub struct LouvainDetector<'a> {
    view: &'a UndirectedView,
    max_iterations: usize,
}

impl<'a> LouvainDetector<'a> {
    pub fn new(view: &'a UndirectedView, max_iterations: usize) -> Self {
        Self { view, max_iterations }
    }

    /// Local-move phase of Louvain on the unweighted undirected projection.
    /// Returns one community label per node index, renumbered by first
    /// appearance so labels are contiguous and stable.
    pub fn detect_communities(&self) -> Vec<usize> {
        let n = self.view.node_count();
        let mut communities: Vec<usize> = (0..n).collect();

        let m = self.view.edges().len() as f64;
        if m == 0.0 {
            return communities;
        }

        let degrees: Vec<f64> = (0..n).map(|node| self.view.neighbors(node).len() as f64).collect();
        // Total degree per community
        let mut sigma: Vec<f64> = degrees.clone();

        let mut improved = true;
        let mut iteration = 0;

        while improved && iteration < self.max_iterations {
            improved = false;
            iteration += 1;

            for node in 0..n {
                let current_comm = communities[node];

                // Links from node into each neighboring community
                let mut neighbor_comms: BTreeMap<usize, f64> = BTreeMap::new();
                for &neighbor in self.view.neighbors(node) {
                    *neighbor_comms.entry(communities[neighbor]).or_insert(0.0) += 1.0;
                }

                let mut best_comm = current_comm;
                let mut best_gain = 0.0;

                for &comm in neighbor_comms.keys() {
                    if comm == current_comm {
                        continue;
                    }

                    let gain = modularity_gain(
                        node,
                        current_comm,
                        comm,
                        &degrees,
                        &sigma,
                        &neighbor_comms,
                        m,
                    );
                    if gain > best_gain {
                        best_gain = gain;
                        best_comm = comm;
                    }
                }

                if best_comm != current_comm {
                    sigma[current_comm] -= degrees[node];
                    sigma[best_comm] += degrees[node];
                    communities[node] = best_comm;
                    improved = true;
                }
            }
        }

        debug!(nodes = n, iterations = iteration, "Louvain local moves finished");
        renumber(&communities)
    }
}

/// Change in modularity from moving `node` out of `from_comm` into `to_comm`
fn modularity_gain(
    node: usize,
    from_comm: usize,
    to_comm: usize,
    degrees: &[f64],
    sigma: &[f64],
    neighbor_comms: &BTreeMap<usize, f64>,
    m: f64,
) -> f64 {
    let k_i = degrees[node];
    let k_i_in_to = neighbor_comms.get(&to_comm).copied().unwrap_or(0.0);
    let k_i_in_from = neighbor_comms.get(&from_comm).copied().unwrap_or(0.0);

    let sigma_to = sigma[to_comm];
    let sigma_from_without = sigma[from_comm] - k_i;

    (k_i_in_to - k_i_in_from) / m - k_i * (sigma_to - sigma_from_without) / (2.0 * m * m)
}

/// Map arbitrary labels to `0..k` in order of first appearance
pub(crate) fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}
