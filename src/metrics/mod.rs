//! Metrics calculation.
//!
//! Fan-in and fan-out are computed per graph from its deduplicated edge
//! set; the top-N rankings draw from the union of both graphs' nodes,
//! exclude zero-valued entries, and break ties by input order.

pub mod loc;

use crate::core::{EdgeSet, RankedNode, TOP_N};
use std::collections::HashMap;

/// Fan-in and fan-out per node key for one graph.
#[derive(Debug, Default)]
pub struct FanMetrics {
    pub fan_in: HashMap<String, usize>,
    pub fan_out: HashMap<String, usize>,
}

impl FanMetrics {
    pub fn fan_in_of(&self, key: &str) -> usize {
        self.fan_in.get(key).copied().unwrap_or(0)
    }

    pub fn fan_out_of(&self, key: &str) -> usize {
        self.fan_out.get(key).copied().unwrap_or(0)
    }
}

/// Count distinct incoming and outgoing edges per endpoint.
pub fn fan_metrics(edges: &EdgeSet) -> FanMetrics {
    let mut metrics = FanMetrics::default();
    for edge in edges.iter() {
        *metrics.fan_out.entry(edge.from.clone()).or_insert(0) += 1;
        *metrics.fan_in.entry(edge.to.clone()).or_insert(0) += 1;
    }
    metrics
}

/// Top-N ranking over `(id, value)` entries in input order.
///
/// Zero-valued entries are excluded; the sort is stable and descending, so
/// equally-ranked entries keep their input order.
pub fn top_ranked(entries: Vec<(String, usize)>) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = entries
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(id, value)| RankedNode { id, value })
        .collect();
    ranked.sort_by(|a, b| b.value.cmp(&a.value));
    ranked.truncate(TOP_N);
    ranked
}
