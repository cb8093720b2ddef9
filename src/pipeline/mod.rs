//! The analysis pipeline.
//!
//! A strictly sequential chain of stages over one request: workspace,
//! triage, project loading, parsing and resolution, aggregation, metrics,
//! cycle detection, and assembly. Each stage is a function over the
//! previous stage's output; a failure anywhere short-circuits with a
//! typed error, and the workspace is released on every exit path.

use crate::aggregate::{lift_edges, map_namespaces};
use crate::analyzers::build_compilations;
use crate::analyzers::resolver::extract_file_edges;
use crate::cancel::CancelFlag;
use crate::config::AtlasConfig;
use crate::core::AnalysisReport;
use crate::cycles::detect_cycles;
use crate::errors::AnalysisError;
use crate::loader::load_projects;
use crate::metrics::loc::count_loc;
use crate::report::{assemble, AssemblerInput};
use crate::triage::triage;
use crate::workspace::Workspace;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// One analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub repo_url: String,
    pub branch: Option<String>,
}

impl AnalysisRequest {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Run one full analysis: acquire a workspace, analyze it, release it.
///
/// This is the single entry point the transport layer calls.
pub fn analyze(
    config: &AtlasConfig,
    request: &AnalysisRequest,
    cancel: &CancelFlag,
) -> Result<AnalysisReport, AnalysisError> {
    let mut workspace = Workspace::acquire(
        config,
        &request.repo_url,
        request.branch.as_deref(),
        cancel,
    )?;
    let commit = workspace.commit().map(str::to_string);
    let result = analyze_workspace(workspace.root(), request, commit, cancel);
    workspace.release();
    result
}

/// Analyze an already-checked-out working tree.
///
/// Runs the same stage chain as [`analyze`] minus acquisition and release.
/// Also the seam determinism tests use: re-running over the same tree must
/// produce an identical report modulo timestamp.
pub fn analyze_workspace(
    root: &Path,
    request: &AnalysisRequest,
    commit: Option<String>,
    cancel: &CancelFlag,
) -> Result<AnalysisReport, AnalysisError> {
    info!(root = %root.display(), "triaging working tree");
    let selection = triage(root, cancel)?;

    info!("loading projects");
    let projects = load_projects(root, &selection, cancel)?;

    info!(projects = projects.len(), "building compilations");
    let (documents, compilations) = build_compilations(&projects, cancel)?;

    info!(documents = documents.len(), "extracting file edges");
    let file_edges = extract_file_edges(&documents, &compilations, cancel)?;

    info!(edges = file_edges.len(), "aggregating namespaces");
    let namespaces = map_namespaces(&documents);
    let namespace_edges = lift_edges(&file_edges, &namespaces);

    // Metrics and cycles read disjoint inputs; both are pure over the
    // edge sets.
    let file_loc: HashMap<String, usize> = documents
        .iter()
        .map(|doc| (doc.info.relative_path.clone(), count_loc(&doc.text)))
        .collect();
    let cycles = detect_cycles(&file_edges);

    info!(cycles = cycles.len(), "assembling report");
    Ok(assemble(AssemblerInput {
        repo: request.repo_url.clone(),
        branch: request.branch.clone(),
        commit,
        documents: &documents,
        file_edges,
        namespace_edges,
        namespaces: &namespaces,
        file_loc: &file_loc,
        cycles,
    }))
}
