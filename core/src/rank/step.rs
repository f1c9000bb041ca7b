use super::{LinkGraph, RankParams, RankStrategy, RankVector};

#[derive(Debug, Clone)]
struct Vertex {
    out_edges: Vec<usize>,
    rank: f64,
}

impl Vertex {
    fn is_dangling(&self) -> bool {
        self.out_edges.is_empty()
    }

    fn send(&self, inbox: &mut [Vec<f64>]) {
        if self.is_dangling() {
            return;
        }
        let share = self.rank / self.out_edges.len() as f64;
        for &dst in &self.out_edges {
            inbox[dst].push(share);
        }
    }

    fn compute(&mut self, messages: &[f64], n: f64, damping: f64, dangling_share: f64) {
        let incoming: f64 = messages.iter().sum();
        self.rank = (1.0 - damping) / n + damping * incoming;
        self.rank += dangling_share;
    }
}

/// Vertex-centric PageRank: every superstep all vertices send, then all vertices compute.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepRank;

impl RankStrategy for StepRank {
    fn name(&self) -> &'static str {
        "step"
    }

    fn compute(&self, graph: &LinkGraph, params: RankParams) -> RankVector {
        if graph.is_empty() {
            return RankVector::new();
        }
        let n = graph.len();
        let mut vertices: Vec<Vertex> = (0..n)
            .map(|i| Vertex { out_edges: graph.out_edges(i).to_vec(), rank: 1.0 / n as f64 })
            .collect();
        let mut inbox: Vec<Vec<f64>> = vec![Vec::new(); n];

        for _ in 0..params.iterations {
            for messages in inbox.iter_mut() {
                messages.clear();
            }
            for v in &vertices {
                v.send(&mut inbox);
            }
            // barrier: every message of this superstep is delivered before any vertex computes
            let dangling_mass: f64 = vertices.iter().filter(|v| v.is_dangling()).map(|v| v.rank).sum();
            let dangling_share = params.damping * dangling_mass / n as f64;
            for (v, messages) in vertices.iter_mut().zip(&inbox) {
                v.compute(messages, n as f64, params.damping, dangling_share);
            }
        }

        tracing::info!(
            strategy = self.name(),
            nodes = n,
            edges = graph.edge_count(),
            supersteps = params.iterations,
            "rank computed"
        );
        let ranks: Vec<f64> = vertices.iter().map(|v| v.rank).collect();
        RankVector::from_dense(graph.nodes(), &ranks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::BatchRank;

    #[test]
    fn matches_batch_on_small_graph() {
        let g = LinkGraph::new(vec![1, 2, 3, 4], vec![(1, 2), (2, 3), (3, 1), (3, 3), (1, 3)]);
        let params = RankParams { iterations: 15, damping: 0.85 };
        let a = BatchRank.compute(&g, params);
        let b = StepRank.compute(&g, params);
        assert!(a.max_deviation(&b) < 1e-12);
    }

    #[test]
    fn empty_graph_yields_empty_vector() {
        let v = StepRank.compute(&LinkGraph::default(), RankParams::default());
        assert!(v.is_empty());
    }

    #[test]
    fn all_dangling_stays_uniform() {
        let g = LinkGraph::new(vec![10, 20, 30], Vec::<(u32, u32)>::new());
        let v = StepRank.compute(&g, RankParams { iterations: 7, damping: 0.85 });
        for (_, s) in v.iter() {
            assert!((s - 1.0 / 3.0).abs() < 1e-12);
        }
    }
}
