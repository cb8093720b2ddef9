//! Report assembly.
//!
//! Composes the final analysis report from stage outputs. Node lists are
//! sorted lexicographically by identifier; edge lists keep insertion
//! order, which the downstream visualization relies on when diffing
//! reports.

use crate::analyzers::ParsedDocument;
use crate::core::{
    file_node_id, namespace_node_id, AnalysisReport, Counts, CycleGroup, EdgeSet, Graph,
    GraphEdge, GraphNode, Graphs, MetricsBlock, ReportMeta, GLOBAL_NAMESPACE,
    GLOBAL_NAMESPACE_LABEL,
};
use crate::metrics::{fan_metrics, top_ranked};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};

/// Everything the assembler needs from earlier stages.
pub struct AssemblerInput<'a> {
    pub repo: String,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub documents: &'a [ParsedDocument],
    /// File edges keyed by repository-relative path.
    pub file_edges: EdgeSet,
    /// Namespace edges keyed by fully-qualified name.
    pub namespace_edges: EdgeSet,
    /// Repository-relative path → primary namespace.
    pub namespaces: &'a HashMap<String, String>,
    /// Repository-relative path → lines of code.
    pub file_loc: &'a HashMap<String, usize>,
    pub cycles: Vec<CycleGroup>,
}

/// Assemble the final report.
pub fn assemble(input: AssemblerInput<'_>) -> AnalysisReport {
    let file_fans = fan_metrics(&input.file_edges);
    let namespace_fans = fan_metrics(&input.namespace_edges);

    // Node sets are the edge endpoints of each graph, in lexicographic
    // order.
    let file_keys: BTreeSet<String> = input
        .file_edges
        .iter()
        .flat_map(|e| [e.from.clone(), e.to.clone()])
        .collect();
    let namespace_keys: BTreeSet<String> = input
        .namespace_edges
        .iter()
        .flat_map(|e| [e.from.clone(), e.to.clone()])
        .collect();

    // Namespace LOC sums over every accepted document mapped to the
    // namespace, participating in edges or not.
    let mut namespace_loc: HashMap<&str, usize> = HashMap::new();
    for doc in input.documents {
        let rel = doc.info.relative_path.as_str();
        if let Some(ns) = input.namespaces.get(rel) {
            let loc = input.file_loc.get(rel).copied().unwrap_or(0);
            *namespace_loc.entry(ns.as_str()).or_insert(0) += loc;
        }
    }

    let mut file_label: HashMap<&str, String> = HashMap::new();
    for doc in input.documents {
        file_label.insert(doc.info.relative_path.as_str(), doc.info.label());
    }

    let file_nodes: Vec<GraphNode> = file_keys
        .iter()
        .map(|key| GraphNode {
            id: file_node_id(key),
            label: file_label
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| base_name(key)),
            loc: input.file_loc.get(key).copied().unwrap_or(0),
            fan_in: file_fans.fan_in_of(key),
            fan_out: file_fans.fan_out_of(key),
        })
        .collect();

    let namespace_nodes: Vec<GraphNode> = namespace_keys
        .iter()
        .map(|key| GraphNode {
            id: namespace_node_id(key),
            label: namespace_label(key),
            loc: namespace_loc.get(key.as_str()).copied().unwrap_or(0),
            fan_in: namespace_fans.fan_in_of(key),
            fan_out: namespace_fans.fan_out_of(key),
        })
        .collect();

    // Rankings draw from both graphs: namespace nodes first, then file
    // nodes, each already in node-list order.
    let fan_in_entries: Vec<(String, usize)> = namespace_nodes
        .iter()
        .map(|n| (n.id.clone(), n.fan_in))
        .chain(file_nodes.iter().map(|n| (n.id.clone(), n.fan_in)))
        .collect();
    let fan_out_entries: Vec<(String, usize)> = namespace_nodes
        .iter()
        .map(|n| (n.id.clone(), n.fan_out))
        .chain(file_nodes.iter().map(|n| (n.id.clone(), n.fan_out)))
        .collect();

    let counts = Counts {
        namespace_nodes: namespace_nodes.len(),
        file_nodes: file_nodes.len(),
        edges: input.file_edges.len() + input.namespace_edges.len(),
    };

    let file_edge_list: Vec<GraphEdge> = input
        .file_edges
        .iter()
        .map(|e| GraphEdge {
            from: file_node_id(&e.from),
            to: file_node_id(&e.to),
        })
        .collect();
    let namespace_edge_list: Vec<GraphEdge> = input
        .namespace_edges
        .iter()
        .map(|e| GraphEdge {
            from: namespace_node_id(&e.from),
            to: namespace_node_id(&e.to),
        })
        .collect();

    AnalysisReport {
        meta: ReportMeta {
            repo: input.repo,
            branch: input.branch,
            commit: input.commit,
            generated_at: Utc::now(),
        },
        graphs: Graphs {
            namespace: Graph {
                nodes: namespace_nodes,
                edges: namespace_edge_list,
            },
            file: Graph {
                nodes: file_nodes,
                edges: file_edge_list,
            },
        },
        metrics: MetricsBlock {
            counts,
            fan_in_top: top_ranked(fan_in_entries),
            fan_out_top: top_ranked(fan_out_entries),
        },
        cycles: input.cycles,
    }
}

/// Display label of a namespace: the last dotted segment.
fn namespace_label(fully_qualified: &str) -> String {
    if fully_qualified == GLOBAL_NAMESPACE {
        return GLOBAL_NAMESPACE_LABEL.to_string();
    }
    fully_qualified
        .rsplit('.')
        .next()
        .unwrap_or(fully_qualified)
        .to_string()
}

fn base_name(relative_path: &str) -> String {
    relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
        .to_string()
}
