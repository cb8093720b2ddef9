//! Parser and resolver stage.
//!
//! For each loaded project this stage parses every document into a syntax
//! tree, builds a project-wide symbol table, and hands both to the
//! resolver for edge extraction. Per-project failures are tolerated as
//! long as at least one project produces a compilation; diagnostic text is
//! scanned for evidence of an unresolved SDK reference.

pub mod csharp;
pub mod resolver;
pub mod symbols;

use crate::cancel::CancelFlag;
use crate::core::SourceDocument;
use crate::errors::AnalysisError;
use crate::loader::LoadedProject;
use rayon::prelude::*;
use symbols::SymbolTable;
use tracing::{debug, warn};
use tree_sitter::Tree;

/// Diagnostic substrings that evidence an unresolved framework or SDK
/// reference.
const MISSING_SDK_MARKERS: [&str; 5] = [
    "The SDK 'Microsoft.NET.Sdk",
    "reference assemblies for framework",
    ".NETFramework,Version=",
    "error NETSDK",
    "Unable to locate the .NET SDK",
];

/// One parsed document, indexed by its global enumeration position.
#[derive(Debug)]
pub struct ParsedDocument {
    /// Position in the global, path-sorted document enumeration.
    pub index: usize,
    pub info: SourceDocument,
    pub text: String,
    pub tree: Tree,
}

/// One project's compilation: its documents, its symbol table, and any
/// diagnostics produced while building it.
#[derive(Debug)]
pub struct ProjectCompilation {
    pub project: String,
    pub target_framework: Option<String>,
    /// Indices into the global parsed-document list.
    pub doc_indices: Vec<usize>,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<String>,
}

/// Parse all documents of all projects and build per-project compilations.
///
/// The returned document list is the global enumeration: sorted by
/// repository-relative path, which pins declaration order for symbols
/// declared in several files.
pub fn build_compilations(
    projects: &[LoadedProject],
    cancel: &CancelFlag,
) -> Result<(Vec<ParsedDocument>, Vec<ProjectCompilation>), AnalysisError> {
    // Flatten into the global enumeration order.
    let mut pending: Vec<(&LoadedProject, &crate::loader::LoadedDocument)> = projects
        .iter()
        .flat_map(|p| p.documents.iter().map(move |d| (p, d)))
        .collect();
    pending.sort_by(|a, b| a.1.info.relative_path.cmp(&b.1.info.relative_path));

    if cancel.is_cancelled() {
        return Err(AnalysisError::internal("analysis cancelled"));
    }

    // Parse fan-out; order is restored by collecting into a Vec.
    let parses: Vec<Result<Tree, String>> = pending
        .par_iter()
        .map(|(_, doc)| csharp::parse(&doc.text).map_err(|e| e.to_string()))
        .collect();

    let mut documents = Vec::new();
    let mut failures: Vec<(String, String)> = Vec::new();
    for ((project, doc), parsed) in pending.into_iter().zip(parses) {
        match parsed {
            Ok(tree) => documents.push(ParsedDocument {
                index: documents.len(),
                info: doc.info.clone(),
                text: doc.text.clone(),
                tree,
            }),
            Err(message) => {
                warn!(file = %doc.info.relative_path, "parse failure: {message}");
                failures.push((
                    project.manifest.name.clone(),
                    format!("failed to parse {}: {message}", doc.info.relative_path),
                ));
            }
        }
    }

    let mut compilations = Vec::new();
    let mut compiled_any = false;
    for project in projects {
        if cancel.is_cancelled() {
            return Err(AnalysisError::internal("analysis cancelled"));
        }
        let doc_indices: Vec<usize> = documents
            .iter()
            .filter(|d| d.info.project == project.manifest.name)
            .map(|d| d.index)
            .collect();
        let diagnostics: Vec<String> = failures
            .iter()
            .filter(|(name, _)| *name == project.manifest.name)
            .map(|(_, message)| message.clone())
            .collect();

        if missing_sdk_in_diagnostics(&diagnostics) {
            return Err(AnalysisError::MissingSdk {
                target: project.manifest.target_framework.clone(),
            });
        }
        if doc_indices.is_empty() {
            debug!(project = %project.manifest.name, "no document compiled");
            compilations.push(ProjectCompilation {
                project: project.manifest.name.clone(),
                target_framework: project.manifest.target_framework.clone(),
                doc_indices,
                symbols: SymbolTable::default(),
                diagnostics,
            });
            continue;
        }

        let project_docs: Vec<&ParsedDocument> =
            doc_indices.iter().map(|&i| &documents[i]).collect();
        let symbols = SymbolTable::build(&project_docs);
        compiled_any = true;
        compilations.push(ProjectCompilation {
            project: project.manifest.name.clone(),
            target_framework: project.manifest.target_framework.clone(),
            doc_indices,
            symbols,
            diagnostics,
        });
    }

    if !compiled_any {
        return Err(AnalysisError::build_failed(
            "Check that the repository restores and builds with a standard .NET SDK, \
             then retry the analysis.",
        ));
    }

    Ok((documents, compilations))
}

/// True when any diagnostic matches the curated missing-SDK marker list.
pub fn missing_sdk_in_diagnostics(diagnostics: &[String]) -> bool {
    diagnostics
        .iter()
        .any(|d| MISSING_SDK_MARKERS.iter().any(|m| d.contains(m)))
}
