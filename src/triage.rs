//! Repository triage.
//!
//! Counts source files against the hard cap, locates the solution or
//! project manifests the loader will materialize, and, on the failure
//! path only, classifies what languages the repository actually contains
//! so the error can tell the user what was found instead.

use crate::cancel::CancelFlag;
use crate::errors::AnalysisError;
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hard cap on the number of C# source files in the working tree.
pub const FILE_CAP: usize = 100_000;

/// Maximum number of representative evidence entries on the error path.
const EVIDENCE_CAP: usize = 10;

/// Outcome of manifest selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSelection {
    /// A solution file governs the repository.
    Solution(PathBuf),
    /// No solution; the set of project manifests found anywhere.
    Projects(Vec<PathBuf>),
}

/// Everything a single walk of the working tree yields.
#[derive(Debug, Default)]
struct TreeScan {
    source_file_count: usize,
    root_solutions: Vec<PathBuf>,
    all_solutions: Vec<PathBuf>,
    projects: Vec<PathBuf>,
    /// language tag → representative evidence entries
    language_evidence: BTreeMap<&'static str, Vec<String>>,
}

/// Triage a working tree: enforce the file cap and select manifests.
pub fn triage(root: &Path, cancel: &CancelFlag) -> Result<ManifestSelection, AnalysisError> {
    let scan = scan_tree(root, cancel)?;

    if scan.source_file_count > FILE_CAP {
        return Err(AnalysisError::limits(format!(
            "{} C# files exceed the cap of {FILE_CAP}",
            scan.source_file_count
        )));
    }

    // Search order: root solution, any solution, project manifests, nothing.
    if let Some(sln) = scan.root_solutions.into_iter().min() {
        debug!(solution = %sln.display(), "selected root solution");
        return Ok(ManifestSelection::Solution(sln));
    }
    if !scan.all_solutions.is_empty() {
        let mut solutions = scan.all_solutions;
        solutions.sort();
        let sln = solutions.remove(0);
        debug!(solution = %sln.display(), "selected nested solution");
        return Ok(ManifestSelection::Solution(sln));
    }
    if !scan.projects.is_empty() {
        let mut projects = scan.projects;
        projects.sort();
        debug!(count = projects.len(), "no solution; using project manifests");
        return Ok(ManifestSelection::Projects(projects));
    }

    let detected_languages = scan
        .language_evidence
        .keys()
        .map(|k| k.to_string())
        .collect();
    let mut found_files: Vec<String> = scan
        .language_evidence
        .into_values()
        .flatten()
        .collect();
    found_files.sort();
    found_files.dedup();
    found_files.truncate(EVIDENCE_CAP);

    Err(AnalysisError::NoSolutionOrProject {
        detected_languages,
        found_files,
    })
}

fn scan_tree(root: &Path, cancel: &CancelFlag) -> Result<TreeScan, AnalysisError> {
    let mut scan = TreeScan::default();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(AnalysisError::internal("analysis cancelled"));
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "cs" => scan.source_file_count += 1,
            "sln" => {
                if path.parent() == Some(root) {
                    scan.root_solutions.push(path.to_path_buf());
                }
                scan.all_solutions.push(path.to_path_buf());
            }
            "csproj" => scan.projects.push(path.to_path_buf()),
            _ => {}
        }

        if let Some(tag) = classify_language(&file_name, &extension) {
            let entries = scan.language_evidence.entry(tag).or_default();
            if entries.len() < EVIDENCE_CAP {
                let rel = path
                    .strip_prefix(root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/");
                entries.push(rel);
            }
        }
    }

    Ok(scan)
}

/// Map a characteristic manifest filename or file extension to a language
/// tag. Used only for the `NoSolutionOrProject` error path.
fn classify_language(file_name: &str, extension: &str) -> Option<&'static str> {
    match file_name {
        "package.json" | "tsconfig.json" => return Some("JavaScript/TypeScript"),
        "pyproject.toml" | "requirements.txt" | "setup.py" => return Some("Python"),
        "pom.xml" | "build.gradle" => return Some("Java"),
        "build.gradle.kts" => return Some("Kotlin"),
        "go.mod" => return Some("Go"),
        "Cargo.toml" => return Some("Rust"),
        "CMakeLists.txt" => return Some("C/C++"),
        "Gemfile" => return Some("Ruby"),
        "composer.json" => return Some("PHP"),
        "Package.swift" => return Some("Swift"),
        _ => {}
    }
    match extension {
        "ts" | "tsx" | "js" | "jsx" | "mjs" => Some("JavaScript/TypeScript"),
        "py" | "pyw" => Some("Python"),
        "java" => Some("Java"),
        "kt" | "kts" => Some("Kotlin"),
        "go" => Some("Go"),
        "rs" => Some("Rust"),
        "c" | "h" | "cc" | "cpp" | "hpp" | "cxx" => Some("C/C++"),
        "rb" => Some("Ruby"),
        "php" => Some("PHP"),
        "swift" => Some("Swift"),
        "m" | "mm" => Some("Objective-C"),
        "sh" | "bash" | "zsh" => Some("Shell"),
        "md" | "rst" | "adoc" => Some("Documentation"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_root_solution_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Zebra.sln", "");
        write(dir.path(), "Alpha.sln", "");
        write(dir.path(), "nested/Nested.sln", "");
        write(dir.path(), "src/App.csproj", "");

        let selection = triage(dir.path(), &CancelFlag::new()).unwrap();
        assert_eq!(
            selection,
            ManifestSelection::Solution(dir.path().join("Alpha.sln"))
        );
    }

    #[test]
    fn test_nested_solution_when_no_root_solution() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "nested/b/B.sln", "");
        write(dir.path(), "nested/a/A.sln", "");

        let selection = triage(dir.path(), &CancelFlag::new()).unwrap();
        match selection {
            ManifestSelection::Solution(path) => {
                assert!(path.ends_with("nested/a/A.sln"), "got {path:?}");
            }
            other => panic!("expected solution, got {other:?}"),
        }
    }

    #[test]
    fn test_projects_when_no_solution() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/App/App.csproj", "");
        write(dir.path(), "src/Lib/Lib.csproj", "");

        let selection = triage(dir.path(), &CancelFlag::new()).unwrap();
        match selection {
            ManifestSelection::Projects(projects) => assert_eq!(projects.len(), 2),
            other => panic!("expected projects, got {other:?}"),
        }
    }

    #[test]
    fn test_language_evidence_on_empty_repo() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", "{}");
        write(dir.path(), "src/index.ts", "export {}");

        let err = triage(dir.path(), &CancelFlag::new()).unwrap_err();
        match err {
            AnalysisError::NoSolutionOrProject {
                detected_languages,
                found_files,
            } => {
                assert!(detected_languages
                    .contains(&"JavaScript/TypeScript".to_string()));
                assert!(found_files.iter().any(|f| f == "package.json"));
            }
            other => panic!("expected NoSolutionOrProject, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_language_table() {
        assert_eq!(classify_language("go.mod", ""), Some("Go"));
        assert_eq!(classify_language("main.py", "py"), Some("Python"));
        assert_eq!(classify_language("run.sh", "sh"), Some("Shell"));
        assert_eq!(classify_language("README.md", "md"), Some("Documentation"));
        assert_eq!(classify_language("data.bin", "bin"), None);
    }
}
