//! Identifier resolution and file-edge extraction.
//!
//! Walks every identifier occurrence in every accepted document, resolves
//! it through the project's symbol table, and emits deduplicated
//! file→file edges keyed by repository-relative path. Individual
//! resolution misses are swallowed; only the edge-count cap aborts.

use crate::analyzers::csharp::{
    callable_local_names, enclosing_callable, enclosing_namespace, enclosing_type_declaration,
    for_each_node, in_using_directive, is_declaration_name, is_use_site, node_text,
};
use crate::analyzers::symbols::SymbolTable;
use crate::analyzers::{ParsedDocument, ProjectCompilation};
use crate::cancel::CancelFlag;
use crate::core::{EdgeSet, GLOBAL_NAMESPACE};
use crate::errors::AnalysisError;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Hard cap on the file-edge set.
pub const EDGE_CAP: usize = 150_000;

/// Extract the deduplicated file-edge set across all compilations.
///
/// Edges are keyed by repository-relative path; node-id prefixes are the
/// assembler's concern. Insertion order is deterministic: documents in
/// enumeration order, identifiers in pre-order within a document.
pub fn extract_file_edges(
    documents: &[ParsedDocument],
    compilations: &[ProjectCompilation],
    cancel: &CancelFlag,
) -> Result<EdgeSet, AnalysisError> {
    let mut edges = EdgeSet::new();
    for compilation in compilations {
        if cancel.is_cancelled() {
            return Err(AnalysisError::internal("analysis cancelled"));
        }
        // Documents fan out in parallel; the per-document edge lists are
        // merged sequentially in enumeration order to keep the output
        // deterministic.
        let per_document: Vec<Vec<(String, String)>> = compilation
            .doc_indices
            .par_iter()
            .map(|&index| document_edges(&documents[index], documents, &compilation.symbols))
            .collect();
        for doc_edges in per_document {
            for (from, to) in doc_edges {
                edges.insert(from, to);
                if edges.len() > EDGE_CAP {
                    return Err(AnalysisError::limits(format!(
                        "file edge count exceeds the cap of {EDGE_CAP}"
                    )));
                }
            }
        }
    }
    Ok(edges)
}

/// Edges contributed by one document, in identifier pre-order.
fn document_edges(
    doc: &ParsedDocument,
    documents: &[ParsedDocument],
    table: &SymbolTable,
) -> Vec<(String, String)> {
    let source = doc.text.as_str();
    let current_path = doc.info.relative_path.as_str();
    let mut edges = Vec::new();
    // Local-scope names are collected once per callable and cached.
    let mut scopes: HashMap<usize, HashSet<String>> = HashMap::new();

    for_each_node(&doc.tree, |node| {
        if node.kind() != "identifier" {
            return;
        }
        if in_using_directive(node) {
            return;
        }
        // Declared names introduce symbols; the syntax model reports only
        // reference occurrences.
        if is_declaration_name(node) {
            return;
        }
        let name = node_text(node, source);
        if name.is_empty() {
            return;
        }

        // Lexical locals and parameters shadow everything else. They are
        // declared in this document, so they can only yield self-edges.
        if let Some(callable) = enclosing_callable(node) {
            let scope = scopes
                .entry(callable.id())
                .or_insert_with(|| callable_local_names(callable, source).into_iter().collect());
            if scope.contains(name) {
                if is_use_site(node) {
                    edges.push((current_path.to_string(), current_path.to_string()));
                }
                return;
            }
        }

        let namespace =
            enclosing_namespace(node, source).unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());

        let resolved = resolve_identifier(node, name, &namespace, source, table);
        let Some(symbol_id) = resolved else {
            debug!(identifier = name, file = current_path, "unresolved identifier");
            return;
        };

        // First declaring file in enumeration order; the rest are ignored
        // for symbols declared in several files.
        let declaring = &documents[table.symbol(symbol_id).declaring_document()];
        let declaring_path = declaring.info.relative_path.as_str();
        if declaring_path != current_path {
            edges.push((current_path.to_string(), declaring_path.to_string()));
        } else if is_use_site(node) {
            edges.push((current_path.to_string(), current_path.to_string()));
        }
    });

    edges
}

/// Resolve one identifier occurrence to a symbol, or none.
fn resolve_identifier(
    node: tree_sitter::Node<'_>,
    name: &str,
    namespace: &str,
    source: &str,
    table: &SymbolTable,
) -> Option<crate::analyzers::symbols::SymbolId> {
    // Member position of a qualified access: resolve through the receiver
    // when the receiver names a known type (static member access).
    if let Some(parent) = node.parent() {
        if parent.kind() == "member_access_expression"
            && parent
                .child_by_field_name("name")
                .map(|n| n.id() == node.id())
                .unwrap_or(false)
        {
            let receiver = parent.child_by_field_name("expression")?;
            if receiver.kind() == "identifier" {
                let receiver_name = node_text(receiver, source);
                let type_id = table.resolve_type(receiver_name, namespace)?;
                let type_fqn = table.symbol(type_id).fqn.clone();
                return table.resolve_member(&type_fqn, name);
            }
            if receiver.kind() == "this_expression" {
                let enclosing = enclosing_type_declaration(node)?;
                let fqn = SymbolTable::type_fqn_of(enclosing, source)?;
                return table.resolve_member(&fqn, name);
            }
            return None;
        }
    }

    // Unqualified member of the enclosing type, partial declarations
    // included.
    if let Some(enclosing) = enclosing_type_declaration(node) {
        if let Some(fqn) = SymbolTable::type_fqn_of(enclosing, source) {
            if let Some(id) = table.resolve_member(&fqn, name) {
                return Some(id);
            }
        }
    }

    table.resolve_type(name, namespace)
}
