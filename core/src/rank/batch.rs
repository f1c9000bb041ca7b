use super::{LinkGraph, RankParams, RankStrategy, RankVector};

/// Scatter/gather PageRank over the whole graph at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRank;

impl BatchRank {
    /// Mass each node receives this round. Dangling nodes spread their rank over all nodes.
    fn scatter(graph: &LinkGraph, ranks: &[f64]) -> Vec<f64> {
        let n = ranks.len() as f64;
        let mut received = vec![0.0f64; ranks.len()];
        let mut broadcast = 0.0f64;
        for (src, &rank) in ranks.iter().enumerate() {
            let targets = graph.out_edges(src);
            if targets.is_empty() {
                broadcast += rank / n;
                continue;
            }
            let share = rank / targets.len() as f64;
            for &dst in targets {
                received[dst] += share;
            }
        }
        if broadcast != 0.0 {
            for r in received.iter_mut() {
                *r += broadcast;
            }
        }
        received
    }

    fn gather(received: Vec<f64>, damping: f64) -> Vec<f64> {
        let n = received.len() as f64;
        let base = (1.0 - damping) / n;
        received.into_iter().map(|mass| base + damping * mass).collect()
    }
}

impl RankStrategy for BatchRank {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn compute(&self, graph: &LinkGraph, params: RankParams) -> RankVector {
        if graph.is_empty() {
            return RankVector::new();
        }
        let n = graph.len();
        let mut ranks = vec![1.0 / n as f64; n];
        for _ in 0..params.iterations {
            let received = Self::scatter(graph, &ranks);
            ranks = Self::gather(received, params.damping);
        }
        tracing::info!(
            strategy = self.name(),
            nodes = n,
            edges = graph.edge_count(),
            iterations = params.iterations,
            "rank computed"
        );
        RankVector::from_dense(graph.nodes(), &ranks)
    }
}
