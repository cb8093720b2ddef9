//! # CodeAtlas
//!
//! Analyzes a remote source repository and produces two directed
//! dependency graphs - file level and namespace level - together with
//! aggregate metrics (lines of code, fan-in, fan-out, top-N rankings) and
//! the strongly connected groups of the file graph. The consumer is an
//! interactive visualization front-end that requests one analysis per
//! repository URL.
//!
//! The pipeline is a single-shot, request-scoped chain of stages:
//!
//! 1. **Workspace** - shallow-clone the repository into an exclusive
//!    scratch directory and resolve the HEAD commit.
//! 2. **Triage** - enforce the file cap and select the solution or
//!    project manifests.
//! 3. **Loader** - materialize projects into source documents, filtering
//!    test projects and generated files.
//! 4. **Parser & resolver** - parse every document, build per-project
//!    symbol tables, and resolve identifier references into file→file
//!    edges.
//! 5. **Aggregator** - lift file edges to namespace edges.
//! 6. **Metrics** - lines of code, fan-in/fan-out, top-N rankings.
//! 7. **Cycles** - strongly connected components of the file graph.
//! 8. **Assembler** - the final JSON-ready report.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codeatlas::{analyze, AnalysisRequest, AtlasConfig, CancelFlag};
//!
//! let config = AtlasConfig::from_env();
//! let request = AnalysisRequest::new("https://github.com/user/repo");
//! let report = analyze(&config, &request, &CancelFlag::new())?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```
//!
//! Working trees that are already on disk can be analyzed without a
//! fetch via [`analyze_workspace`], which is also the seam the test
//! suite drives.

pub mod aggregate;
pub mod analyzers;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod core;
pub mod cycles;
pub mod errors;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod triage;
pub mod workspace;

pub use cancel::CancelFlag;
pub use config::AtlasConfig;
pub use core::AnalysisReport;
pub use errors::{AnalysisError, ErrorBody};
pub use pipeline::{analyze, analyze_workspace, AnalysisRequest};
