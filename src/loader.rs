//! Project loading.
//!
//! Materializes each selected project into its set of source documents,
//! applying the generated-file rule, the test-project filter, and the
//! safety caps that keep pathological inputs from exhausting the process.

use crate::cancel::CancelFlag;
use crate::core::{ProjectManifest, SourceDocument};
use crate::errors::AnalysisError;
use crate::triage::ManifestSelection;
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Caps for direct-filesystem loading.
pub const MAX_PROJECTS: usize = 10;
pub const MAX_DOCUMENTS_PER_PROJECT: usize = 50;

/// Total decoded source text across all loaded documents.
pub const MAX_TOTAL_SOURCE_BYTES: u64 = 200 * 1024 * 1024;

/// A source document together with its decoded text.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub info: SourceDocument,
    pub text: String,
}

/// A project that survived filtering, bearing its documents.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub manifest: ProjectManifest,
    pub documents: Vec<LoadedDocument>,
}

/// Load all projects named by the manifest selection.
pub fn load_projects(
    root: &Path,
    selection: &ManifestSelection,
    cancel: &CancelFlag,
) -> Result<Vec<LoadedProject>, AnalysisError> {
    let mut manifest_paths = match selection {
        ManifestSelection::Solution(sln) => {
            let sln_dir = sln.parent().unwrap_or(root);
            discover_project_manifests(sln_dir)
        }
        ManifestSelection::Projects(paths) => paths.clone(),
    };
    manifest_paths.sort();
    manifest_paths.dedup();

    let mut projects = Vec::new();
    let mut claimed_paths: HashSet<String> = HashSet::new();
    let mut total_bytes: u64 = 0;

    for manifest_path in manifest_paths {
        if cancel.is_cancelled() {
            return Err(AnalysisError::internal("analysis cancelled"));
        }
        if projects.len() >= MAX_PROJECTS {
            debug!("project cap reached; ignoring remaining manifests");
            break;
        }

        let manifest = read_manifest(&manifest_path);
        if manifest.excluded {
            debug!(project = %manifest.name, "excluded test project");
            continue;
        }

        let project_dir = manifest_path.parent().unwrap_or(root);
        let mut documents = Vec::new();
        for path in discover_source_files(project_dir) {
            if documents.len() >= MAX_DOCUMENTS_PER_PROJECT {
                debug!(project = %manifest.name, "document cap reached");
                break;
            }
            let relative = relative_slash_path(root, &path);
            if is_generated_file(&relative) {
                continue;
            }
            // Overlapping project directories: first owner keeps the file.
            if claimed_paths.contains(&relative) {
                continue;
            }
            let text = match read_source_text(&path) {
                Some(text) => text,
                None => continue,
            };
            total_bytes += text.len() as u64;
            if total_bytes > MAX_TOTAL_SOURCE_BYTES {
                return Err(AnalysisError::limits(format!(
                    "total source text exceeds {} bytes",
                    MAX_TOTAL_SOURCE_BYTES
                )));
            }
            claimed_paths.insert(relative.clone());
            documents.push(LoadedDocument {
                info: SourceDocument {
                    absolute_path: path,
                    relative_path: relative,
                    project: manifest.name.clone(),
                    generated: false,
                },
                text,
            });
        }

        if documents.is_empty() {
            debug!(project = %manifest.name, "excluded empty project");
            continue;
        }

        documents.sort_by(|a, b| a.info.relative_path.cmp(&b.info.relative_path));
        projects.push(LoadedProject {
            manifest,
            documents,
        });
    }

    if projects.is_empty() {
        return Err(AnalysisError::NoSuitableProjects);
    }
    Ok(projects)
}

/// Discover `.csproj` manifests under a directory subtree.
fn discover_project_manifests(dir: &Path) -> Vec<PathBuf> {
    let mut manifests = Vec::new();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();
    for entry in walker.flatten() {
        let path = entry.path();
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("csproj"))
                .unwrap_or(false)
        {
            manifests.push(path.to_path_buf());
        }
    }
    manifests
}

/// Discover `.cs` source files under a project directory, sorted.
fn discover_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();
    for entry in walker.flatten() {
        let path = entry.path();
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("cs"))
                .unwrap_or(false)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

fn read_manifest(manifest_path: &Path) -> ProjectManifest {
    let name = manifest_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let target_framework = fs::read_to_string(manifest_path)
        .ok()
        .and_then(|content| scrape_target_framework(&content));
    let excluded = is_test_project(&name, manifest_path);
    ProjectManifest {
        manifest_path: manifest_path.to_path_buf(),
        name,
        target_framework,
        excluded,
    }
}

/// First target framework tag declared by the manifest, if any.
fn scrape_target_framework(manifest: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"<TargetFrameworks?>\s*([^<]+?)\s*</TargetFrameworks?>").unwrap()
    });
    let captured = re.captures(manifest)?.get(1)?.as_str();
    captured.split(';').next().map(|s| s.trim().to_string())
}

/// Test projects are excluded: matched by name suffix conventions or by a
/// test directory segment anywhere on the manifest path.
pub fn is_test_project(name: &str, manifest_path: &Path) -> bool {
    let lower = name.to_lowercase();
    const MARKERS: [&str; 5] = [".tests", ".test", ".specs", ".spec", ".benchmarks"];
    if MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    manifest_path.components().any(|c| {
        let segment = c.as_os_str().to_string_lossy().to_lowercase();
        segment == "test" || segment == "tests"
    })
}

/// Generated files are excluded by path or filename pattern.
pub fn is_generated_file(relative_path: &str) -> bool {
    let lower = relative_path.to_lowercase();
    if lower
        .split('/')
        .any(|segment| segment == "obj" || segment == "bin")
    {
        return true;
    }
    lower.ends_with(".g.cs") || lower.ends_with(".generated.cs") || lower.ends_with(".designer.cs")
}

/// Repository-relative path with forward slashes.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn read_source_text(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), "unreadable source file: {e}");
            return None;
        }
    };
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if let Some(stripped) = text.strip_prefix('\u{feff}') {
        text = stripped.to_string();
    }
    Some(text)
}
