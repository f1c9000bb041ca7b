//! Link-based authority scores.
//!
//! Two strategies compute the same PageRank-style distribution: [`BatchRank`] scatters every
//! node's rank across its out-edges and gathers per destination, [`StepRank`] advances an
//! array of vertices in lockstep supersteps. Both run a fixed number of rounds and produce
//! vectors that agree within floating-point tolerance.

mod batch;
mod step;

pub use batch::BatchRank;
pub use step::StepRank;

use crate::store::GraphSource;
use crate::{DocId, Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_ITERATIONS: usize = 20;
pub const DEFAULT_DAMPING: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankParams {
    pub iterations: usize,
    pub damping: f64,
}

impl Default for RankParams {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, damping: DEFAULT_DAMPING }
    }
}

impl RankParams {
    pub fn new(iterations: usize, damping: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&damping) {
            return Err(SearchError::InvalidParameter(format!("damping must be within [0, 1], got {damping}")));
        }
        Ok(Self { iterations, damping })
    }
}

/// Nodes in a fixed order plus out-edges as dense indices into that order.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    nodes: Vec<DocId>,
    out_edges: Vec<Vec<usize>>,
}

impl LinkGraph {
    /// Builds the graph from node ids and (source, destination) pairs. Repeated node ids
    /// collapse to their first occurrence. Duplicate edges are kept; edges touching an
    /// unknown node are dropped.
    pub fn new(nodes: Vec<DocId>, links: impl IntoIterator<Item = (DocId, DocId)>) -> Self {
        let mut position: HashMap<DocId, usize> = HashMap::with_capacity(nodes.len());
        let listed = nodes.len();
        let nodes: Vec<DocId> = nodes
            .into_iter()
            .filter(|&id| {
                let next = position.len();
                match position.entry(id) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(slot) => {
                        slot.insert(next);
                        true
                    }
                }
            })
            .collect();
        if nodes.len() < listed {
            tracing::warn!(repeated = listed - nodes.len(), "collapsed repeated document ids in link graph");
        }
        let mut out_edges = vec![Vec::new(); nodes.len()];
        let mut dropped = 0usize;
        for (from, to) in links {
            match (position.get(&from), position.get(&to)) {
                (Some(&src), Some(&dst)) => out_edges[src].push(dst),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "ignored links with an endpoint outside the document set");
        }
        Self { nodes, out_edges }
    }

    /// Snapshot of the source's documents and links.
    pub fn from_source<G: GraphSource + ?Sized>(source: &G) -> Result<Self> {
        let nodes = source.list_documents()?.into_iter().map(|d| d.id).collect();
        let links = source.list_links()?;
        Ok(Self::new(nodes, links.into_iter().map(|l| (l.from, l.to))))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DocId] {
        &self.nodes
    }

    pub fn out_edges(&self, idx: usize) -> &[usize] {
        &self.out_edges[idx]
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }
}

/// Authority score per document. Sums to 1.0 for a non-empty graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankVector {
    scores: BTreeMap<DocId, f64>,
}

impl RankVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_dense(nodes: &[DocId], ranks: &[f64]) -> Self {
        Self { scores: nodes.iter().copied().zip(ranks.iter().copied()).collect() }
    }

    pub fn get(&self, doc_id: DocId) -> Option<f64> {
        self.scores.get(&doc_id).copied()
    }

    pub fn insert(&mut self, doc_id: DocId, score: f64) {
        self.scores.insert(doc_id, score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, f64)> + '_ {
        self.scores.iter().map(|(&id, &s)| (id, s))
    }

    /// Documents by descending score; equal scores keep ascending id order.
    pub fn ranked(&self) -> Vec<(DocId, f64)> {
        let mut out: Vec<(DocId, f64)> = self.iter().collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }

    /// Largest per-document absolute difference. A document present in only one vector counts
    /// with its full score.
    pub fn max_deviation(&self, other: &RankVector) -> f64 {
        let mut worst = 0.0f64;
        for (id, s) in self.iter() {
            worst = worst.max((s - other.get(id).unwrap_or(0.0)).abs());
        }
        for (id, s) in other.iter() {
            if self.get(id).is_none() {
                worst = worst.max(s.abs());
            }
        }
        worst
    }
}

/// Shared contract of the ranking strategies.
pub trait RankStrategy {
    fn name(&self) -> &'static str;

    fn compute(&self, graph: &LinkGraph, params: RankParams) -> RankVector;
}

/// Strategy selector for the outer surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Batch,
    Step,
}

impl Strategy {
    pub fn compute(self, graph: &LinkGraph, params: RankParams) -> RankVector {
        match self {
            Strategy::Batch => BatchRank.compute(graph, params),
            Strategy::Step => StepRank.compute(graph, params),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "batch" | "mapreduce" => Ok(Strategy::Batch),
            "step" | "pregel" => Ok(Strategy::Step),
            other => Err(SearchError::InvalidParameter(format!("unknown rank strategy '{other}'"))),
        }
    }
}
