//! Workspace acquisition and release.
//!
//! Acquires an exclusive scratch directory, performs a shallow single-branch
//! fetch of the remote repository through the git CLI, records the resolved
//! HEAD commit, and guarantees the directory is deleted on every exit path.

use crate::cancel::CancelFlag;
use crate::config::AtlasConfig;
use crate::errors::{AnalysisError, CloneFailureReason};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Wall-clock budget for the repository fetch.
pub const FETCH_BUDGET: Duration = Duration::from_secs(120);

/// Prefix of per-request workspace directory names.
const WORKSPACE_PREFIX: &str = "codeatlas-";

/// Poll interval while waiting on the fetch subprocess.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An exclusive temporary directory holding one request's working tree.
///
/// Dropping the workspace deletes the directory; `release` does the same
/// explicitly and is idempotent.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    commit: Option<String>,
    released: bool,
}

impl Workspace {
    /// Acquire a scratch directory and fetch the repository into it.
    ///
    /// The directory name is the fixed prefix plus an 8-character random
    /// token, so no two concurrent requests share a path.
    pub fn acquire(
        config: &AtlasConfig,
        url: &str,
        branch: Option<&str>,
        cancel: &CancelFlag,
    ) -> Result<Self, AnalysisError> {
        let token: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let root = config.scratch_root.join(format!("{WORKSPACE_PREFIX}{token}"));
        fs::create_dir_all(&root)
            .map_err(|e| AnalysisError::internal(format!("failed to create workspace: {e}")))?;

        let mut workspace = Self {
            root,
            commit: None,
            released: false,
        };

        let normalized = normalize_url(url);
        debug!(url = %normalized, root = %workspace.root.display(), "fetching repository");

        match run_fetch(config, &normalized, branch, &workspace.root, cancel) {
            Ok(()) => {}
            Err(err) => {
                workspace.release();
                return Err(err);
            }
        }

        // A missing commit is not fatal; the report field stays absent.
        workspace.commit = resolve_head(config, &workspace.root);

        Ok(workspace)
    }

    /// Root of the checked-out working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full commit identifier of HEAD, when it could be resolved.
    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    /// Delete the workspace directory. Idempotent; absorbs its own errors.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        remove_tree(&self.root);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// Prepend `https://` when the URL carries no recognized transport scheme
/// and is not in `user@host:path` scp form.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let has_scheme = ["http://", "https://", "git://", "ssh://"]
        .iter()
        .any(|s| trimmed.starts_with(s));
    if has_scheme {
        return trimmed.to_string();
    }
    // user@host:path is an scp-style remote, leave as-is.
    let scp_form = trimmed
        .split_once('@')
        .map(|(user, rest)| !user.is_empty() && rest.contains(':'))
        .unwrap_or(false);
    if scp_form {
        return trimmed.to_string();
    }
    format!("https://{trimmed}")
}

fn run_fetch(
    config: &AtlasConfig,
    url: &str,
    branch: Option<&str>,
    dest: &Path,
    cancel: &CancelFlag,
) -> Result<(), AnalysisError> {
    let mut cmd = Command::new(&config.git_binary);
    cmd.arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--single-branch")
        .arg("--no-tags")
        .arg("-c")
        .arg("core.longpaths=true");
    if let Some(branch) = branch {
        cmd.arg("--branch").arg(branch);
    }
    cmd.arg(url)
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        AnalysisError::internal(format!("failed to spawn {}: {e}", config.git_binary))
    })?;

    // Drain stderr on a separate thread so a chatty transport cannot fill
    // the pipe and wedge the child.
    let stderr_handle = child.stderr.take();
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stderr) = stderr_handle {
            let _ = stderr.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + FETCH_BUDGET;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                return Err(AnalysisError::internal(format!(
                    "failed to wait on git: {e}"
                )));
            }
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AnalysisError::internal("analysis cancelled"));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AnalysisError::timeout(FETCH_BUDGET.as_secs()));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader.join().unwrap_or_default();

    if status.success() {
        return Ok(());
    }

    if is_long_path_checkout_failure(&stderr) {
        // The fetch itself succeeded; rely on whatever files were checked
        // out before the long-path failure.
        warn!("continuing after long-path checkout failure");
        return Ok(());
    }

    let reason = CloneFailureReason::from_stderr(&stderr);
    let detail = stderr.lines().rev().find(|l| !l.trim().is_empty());
    Err(AnalysisError::clone_failed(
        reason,
        detail.unwrap_or("").trim(),
    ))
}

/// True when every error line on the transport's stderr evidences a
/// long-path checkout failure and nothing else went wrong.
fn is_long_path_checkout_failure(stderr: &str) -> bool {
    let error_lines: Vec<&str> = stderr
        .lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("error:") || t.starts_with("fatal:")
        })
        .collect();
    if error_lines.is_empty() {
        return false;
    }
    error_lines.iter().all(|line| {
        line.contains("Filename too long")
            || line.contains("unable to checkout working tree")
            || line.contains("Clone succeeded, but checkout failed")
    })
}

fn resolve_head(config: &AtlasConfig, root: &Path) -> Option<String> {
    let output = Command::new(&config.git_binary)
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(root)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        debug!("could not resolve HEAD");
        return None;
    }
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if commit.is_empty() {
        None
    } else {
        Some(commit)
    }
}

/// Remove a directory tree, clearing read-only bits when the first attempt
/// fails (git object files are read-only on some platforms).
fn remove_tree(root: &Path) {
    if !root.exists() {
        return;
    }
    if fs::remove_dir_all(root).is_ok() {
        return;
    }
    clear_readonly(root);
    if let Err(e) = fs::remove_dir_all(root) {
        warn!(root = %root.display(), "failed to remove workspace: {e}");
    }
}

fn clear_readonly(path: &Path) {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        let mut perms = metadata.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            let _ = fs::set_permissions(path, perms);
        }
        if metadata.is_dir() {
            if let Ok(entries) = fs::read_dir(path) {
                for entry in entries.flatten() {
                    clear_readonly(&entry.path());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_adds_https() {
        assert_eq!(
            normalize_url("github.com/foo/bar"),
            "https://github.com/foo/bar"
        );
    }

    #[test]
    fn test_normalize_url_keeps_schemes() {
        assert_eq!(
            normalize_url("https://github.com/foo/bar"),
            "https://github.com/foo/bar"
        );
        assert_eq!(normalize_url("git://host/repo"), "git://host/repo");
        assert_eq!(normalize_url("ssh://host/repo"), "ssh://host/repo");
    }

    #[test]
    fn test_normalize_url_keeps_scp_form() {
        assert_eq!(
            normalize_url("git@github.com:foo/bar.git"),
            "git@github.com:foo/bar.git"
        );
    }

    #[test]
    fn test_long_path_failure_detection() {
        let stderr = "error: unable to create file src/some/very/long/path.cs: Filename too long\n\
                      fatal: unable to checkout working tree\n\
                      warning: Clone succeeded, but checkout failed.";
        assert!(is_long_path_checkout_failure(stderr));
    }

    #[test]
    fn test_other_failures_are_not_long_path() {
        assert!(!is_long_path_checkout_failure(
            "fatal: repository 'x' not found"
        ));
        assert!(!is_long_path_checkout_failure(""));
        // Mixed failures do not qualify.
        let mixed = "error: unable to create file a.cs: Filename too long\n\
                     fatal: the remote end hung up unexpectedly";
        assert!(!is_long_path_checkout_failure(mixed));
    }

    #[test]
    fn test_release_is_idempotent() {
        let root = std::env::temp_dir().join(format!(
            "{WORKSPACE_PREFIX}test-{}",
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("file.txt"), "x").unwrap();
        let mut ws = Workspace {
            root: root.clone(),
            commit: None,
            released: false,
        };
        ws.release();
        assert!(!root.exists());
        ws.release();
        assert!(!root.exists());
    }
}
