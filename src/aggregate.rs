//! Namespace aggregation.
//!
//! Maps every accepted document to its primary namespace and lifts the
//! file-edge set to namespace edges. Self-loops survive the lift; the set
//! dedupes them to one loop per namespace.

use crate::analyzers::csharp::primary_namespace;
use crate::analyzers::ParsedDocument;
use crate::core::{EdgeSet, GLOBAL_NAMESPACE};
use std::collections::HashMap;

/// Primary namespace per repository-relative path.
///
/// A file-scoped namespace wins over block forms; files with no namespace
/// map to the synthetic global namespace.
pub fn map_namespaces(documents: &[ParsedDocument]) -> HashMap<String, String> {
    documents
        .iter()
        .map(|doc| {
            let namespace = primary_namespace(&doc.tree, &doc.text)
                .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());
            (doc.info.relative_path.clone(), namespace)
        })
        .collect()
}

/// Lift file edges to namespace edges through the file→namespace mapping.
pub fn lift_edges(file_edges: &EdgeSet, namespaces: &HashMap<String, String>) -> EdgeSet {
    let mut lifted = EdgeSet::new();
    for edge in file_edges.iter() {
        let from = namespaces
            .get(&edge.from)
            .cloned()
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());
        let to = namespaces
            .get(&edge.to)
            .cloned()
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());
        lifted.insert(from, to);
    }
    lifted
}
