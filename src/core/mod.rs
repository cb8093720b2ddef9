//! Shared data model for the analysis pipeline.
//!
//! Every type here is owned by a single request-scoped pipeline run and
//! dropped when the request ends. Wire-facing types serialize in camelCase
//! to match the report schema consumed by the visualization front-end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Fully-qualified name assigned to files that declare no namespace.
pub const GLOBAL_NAMESPACE: &str = "<global>";

/// Display label for the synthetic global namespace node.
pub const GLOBAL_NAMESPACE_LABEL: &str = "(global)";

/// Number of entries in the fan-in/fan-out rankings.
pub const TOP_N: usize = 5;

/// Canonical node identifier for a file, keyed by repository-relative path.
pub fn file_node_id(relative_path: &str) -> String {
    format!("File:{relative_path}")
}

/// Canonical node identifier for a namespace, keyed by fully-qualified name.
pub fn namespace_node_id(fully_qualified: &str) -> String {
    format!("Namespace:{fully_qualified}")
}

/// A project manifest discovered under the working tree.
///
/// Carries enough context for filtering (test projects, non-C# projects)
/// and for the missing-SDK error path (target framework tag).
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    /// Absolute path of the `.csproj` file.
    pub manifest_path: PathBuf,
    /// Project name derived from the manifest file stem.
    pub name: String,
    /// Target framework tag scraped from the manifest, e.g. `net8.0`.
    pub target_framework: Option<String>,
    /// Set when the project is filtered out (test project, wrong language).
    pub excluded: bool,
}

/// A source file accepted for analysis.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Absolute filesystem path.
    pub absolute_path: PathBuf,
    /// Repository-relative path with forward-slash separators. Unique
    /// across all documents in a request.
    pub relative_path: String,
    /// Name of the owning project.
    pub project: String,
    /// Matched the generated-file rule. Generated documents never make it
    /// into a loaded project; the flag exists for diagnostics.
    pub generated: bool,
}

impl SourceDocument {
    /// Node identifier of this document in the file graph.
    pub fn node_id(&self) -> String {
        file_node_id(&self.relative_path)
    }

    /// Display label: the file name without directories.
    pub fn label(&self) -> String {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
            .to_string()
    }
}

/// A node in either output graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub loc: usize,
    pub fan_in: usize,
    pub fan_out: usize,
}

/// A directed edge between two node identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Deduplicated edge collection that preserves first-insertion order.
///
/// Membership is a set keyed by `(from, to)`; the edge list the report
/// serializes keeps the order edges were first seen, which pins the output
/// across runs on identical inputs.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<GraphEdge>,
    seen: HashSet<(String, String)>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge; returns true if it was not already present.
    pub fn insert(&mut self, from: String, to: String) -> bool {
        let key = (from, to);
        if self.seen.contains(&key) {
            return false;
        }
        self.edges.push(GraphEdge {
            from: key.0.clone(),
            to: key.1.clone(),
        });
        self.seen.insert(key);
        true
    }

    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.from == from && e.to == to)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    /// Borrow the edges in insertion order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Consume the set, yielding edges in insertion order.
    pub fn into_edges(self) -> Vec<GraphEdge> {
        self.edges
    }
}

/// One output graph: node list plus insertion-ordered edge list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// The two graphs of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graphs {
    pub namespace: Graph,
    pub file: Graph,
}

/// A strongly connected component of the file graph with two or more
/// members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleGroup {
    /// Stable identifier assigned in discovery order, starting at 1.
    pub id: usize,
    pub size: usize,
    /// Up to five member node identifiers.
    pub sample: Vec<String>,
}

/// Node counts and total edge count across both graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub namespace_nodes: usize,
    pub file_nodes: usize,
    pub edges: usize,
}

/// One entry of a fan-in or fan-out ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedNode {
    pub id: String,
    pub value: usize,
}

/// The metrics block of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBlock {
    pub counts: Counts,
    pub fan_in_top: Vec<RankedNode>,
    pub fan_out_top: Vec<RankedNode>,
}

/// Request metadata carried into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(with = "iso8601")]
    pub generated_at: DateTime<Utc>,
}

/// Fixed ISO-8601 profile for report timestamps: UTC, second precision,
/// trailing `Z`.
pub mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map_err(serde::de::Error::custom)?;
        Ok(naive.and_utc())
    }
}

/// The final artifact of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub graphs: Graphs,
    pub metrics: MetricsBlock,
    pub cycles: Vec<CycleGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_schemes() {
        assert_eq!(file_node_id("src/A.cs"), "File:src/A.cs");
        assert_eq!(namespace_node_id("X.Y"), "Namespace:X.Y");
        assert_eq!(namespace_node_id(GLOBAL_NAMESPACE), "Namespace:<global>");
    }

    #[test]
    fn test_edge_set_dedupes() {
        let mut set = EdgeSet::new();
        assert!(set.insert("a".into(), "b".into()));
        assert!(!set.insert("a".into(), "b".into()));
        assert!(set.insert("b".into(), "a".into()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_edge_set_preserves_insertion_order() {
        let mut set = EdgeSet::new();
        set.insert("c".into(), "d".into());
        set.insert("a".into(), "b".into());
        set.insert("c".into(), "d".into());
        let edges = set.into_edges();
        assert_eq!(edges[0].from, "c");
        assert_eq!(edges[1].from, "a");
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_document_label() {
        let doc = SourceDocument {
            absolute_path: PathBuf::from("/tmp/ws/src/A.cs"),
            relative_path: "src/A.cs".into(),
            project: "App".into(),
            generated: false,
        };
        assert_eq!(doc.label(), "A.cs");
        assert_eq!(doc.node_id(), "File:src/A.cs");
    }

    #[test]
    fn test_counts_serialize_camel_case() {
        let counts = Counts {
            namespace_nodes: 1,
            file_nodes: 2,
            edges: 3,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert!(json.contains("namespaceNodes"));
        assert!(json.contains("fileNodes"));
    }
}
