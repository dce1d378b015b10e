//! Katz centrality and average degree connectivity.

use serde::{Deserialize, Serialize};

use crate::config::KatzParams;
use crate::store::AdGraph;
use crate::types::node::NodeIndex;

/// Scale applied after L2 normalization.
pub const KATZ_SCALE: f64 = 1000.0;

/// Result of a Katz solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KatzOutcome {
    /// Converged and published.
    Converged {
        /// Iterations used.
        iterations: usize,
    },
    /// Hit the iteration cap; the previous values were kept.
    NotConverged {
        /// Iterations used.
        iterations: usize,
    },
}

impl KatzOutcome {
    /// Whether the solve published new values.
    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

impl AdGraph {
    /// Recompute Katz centrality by power iteration.
    ///
    /// Each step sets `x_i = alpha * sum(x_j for j in parents(i)) + beta`,
    /// starting from `x = beta`. The solve converges when the L1 change
    /// drops below `node_count * tol`; the result is then L2-normalized and
    /// scaled by [`KATZ_SCALE`]. A solve that hits `max_iter` leaves the
    /// cache exactly as it was before the call.
    pub fn update_katz_centrality(&mut self, params: &KatzParams) -> KatzOutcome {
        let n = self.node_count();
        if n == 0 {
            return KatzOutcome::Converged { iterations: 0 };
        }

        let mut x = vec![params.beta; n];
        let mut next = vec![0.0; n];
        let threshold = n as f64 * params.tol;

        for iteration in 1..=params.max_iter {
            for (i, node) in self.nodes().iter().enumerate() {
                let incoming: f64 = node.parents.iter().map(|p| x[p.index()]).sum();
                next[i] = params.alpha * incoming + params.beta;
            }

            let error: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
            std::mem::swap(&mut x, &mut next);

            if error < threshold {
                let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
                let factor = if norm > 0.0 { KATZ_SCALE / norm } else { 0.0 };
                let cache = self.centrality_mut();
                for (slot, value) in cache.iter_mut().zip(&x) {
                    *slot = value * factor;
                }
                tracing::debug!(iterations = iteration, nodes = n, "katz centrality converged");
                return KatzOutcome::Converged { iterations: iteration };
            }
        }

        tracing::warn!(
            max_iter = params.max_iter,
            alpha = params.alpha,
            nodes = n,
            "katz centrality did not converge, keeping previous values"
        );
        KatzOutcome::NotConverged {
            iterations: params.max_iter,
        }
    }

    /// Mean neighbor degree of `idx` divided by its own degree and by the
    /// graph's maximum degree. Neighbors are parents and children, counted
    /// once per edge. Isolated or unknown nodes yield 0.
    pub fn average_degree_connectivity(&self, idx: NodeIndex) -> f64 {
        let Some(node) = self.node(idx) else {
            return 0.0;
        };
        let degree = node.degree();
        let max_degree = self.max_degree();
        if degree == 0 || max_degree == 0 {
            return 0.0;
        }

        let neighbor_sum: usize = node
            .parents
            .iter()
            .chain(&node.children)
            .filter_map(|n| self.node(*n))
            .map(|n| n.degree())
            .sum();

        (neighbor_sum as f64 / degree as f64) / max_degree as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::edge::EdgeKind;
    use crate::types::node::{HtmlElement, NodeId, NodeKind};

    fn graph_with(n: usize, edges: &[(usize, usize)]) -> AdGraph {
        let mut graph = AdGraph::new("https://example.com/");
        for i in 0..n {
            graph
                .create_node(
                    NodeId::element(&i.to_string()),
                    NodeKind::Element(HtmlElement::new("div")),
                )
                .unwrap();
        }
        for (a, b) in edges {
            graph.link(NodeIndex(*a), NodeIndex(*b), EdgeKind::Dom).unwrap();
        }
        graph
    }

    #[test]
    fn test_edgeless_graph_converges_immediately() {
        let mut graph = graph_with(4, &[]);
        let outcome = graph.update_katz_centrality(&KatzParams::default());
        assert_eq!(outcome, KatzOutcome::Converged { iterations: 1 });
        for v in graph.centrality_values() {
            assert!((v - 500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalized_to_unit_l2() {
        let mut graph = graph_with(4, &[(0, 1), (1, 2), (0, 3)]);
        assert!(graph.update_katz_centrality(&KatzParams::default()).converged());
        let norm: f64 = graph
            .centrality_values()
            .iter()
            .map(|v| (v / KATZ_SCALE).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        // Deeper nodes accumulate more.
        assert!(graph.centrality(NodeIndex(2)) > graph.centrality(NodeIndex(0)));
    }

    #[test]
    fn test_non_convergence_rolls_back() {
        let mut graph = graph_with(2, &[(0, 1), (1, 0)]);
        assert!(graph.update_katz_centrality(&KatzParams::default()).converged());
        let before = graph.centrality_values().to_vec();

        let diverging = KatzParams {
            alpha: 2.0,
            max_iter: 50,
            ..KatzParams::default()
        };
        let outcome = graph.update_katz_centrality(&diverging);
        assert_eq!(outcome, KatzOutcome::NotConverged { iterations: 50 });
        assert_eq!(graph.centrality_values(), before.as_slice());
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = AdGraph::new("https://example.com/");
        assert!(graph.update_katz_centrality(&KatzParams::default()).converged());
    }

    #[test]
    fn test_connectivity_isolated_is_zero() {
        let graph = graph_with(3, &[(0, 1)]);
        assert_eq!(graph.average_degree_connectivity(NodeIndex(2)), 0.0);
    }

    #[test]
    fn test_connectivity_star() {
        // Hub 0 with three leaves: hub degree 3, leaves degree 1.
        let graph = graph_with(4, &[(0, 1), (0, 2), (0, 3)]);
        let hub = graph.average_degree_connectivity(NodeIndex(0));
        let leaf = graph.average_degree_connectivity(NodeIndex(1));
        assert!((hub - (3.0 / 3.0) / 3.0).abs() < 1e-12);
        assert!((leaf - (3.0 / 1.0) / 3.0).abs() < 1e-12);
    }
}
