//! Pipeline configuration.
//!
//! Two settings: the scratch root under which per-request workspaces are
//! created, and the executable name of the version-control tool. Both are
//! passed explicitly into the pipeline context rather than read from any
//! ambient global.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the scratch root directory.
pub const ENV_SCRATCH_ROOT: &str = "CODEATLAS_SCRATCH_ROOT";

/// Environment variable overriding the git executable name.
pub const ENV_GIT_BINARY: &str = "CODEATLAS_GIT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Directory under which per-request workspaces are created.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Executable name (or path) of the version-control CLI.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            git_binary: default_git_binary(),
        }
    }
}

impl AtlasConfig {
    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ENV_SCRATCH_ROOT) {
            if !root.trim().is_empty() {
                config.scratch_root = PathBuf::from(root);
            }
        }
        if let Ok(git) = std::env::var(ENV_GIT_BINARY) {
            if !git.trim().is_empty() {
                config.git_binary = git;
            }
        }
        config
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_git_binary() -> String {
    "git".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.git_binary, "git");
        assert_eq!(config.scratch_root, std::env::temp_dir());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AtlasConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.git_binary, "git");
    }
}
