//! Unified error types for analysis pipeline operations.
//!
//! Every stage returns either its result or one of these typed errors;
//! errors short-circuit the pipeline and map onto the wire-level error
//! body the transport layer returns. Interior helpers use `anyhow` and are
//! converted at stage boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Classified reason for a failed repository fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneFailureReason {
    NotFound,
    PermissionDenied,
    Timeout,
    Network,
    Other,
}

impl CloneFailureReason {
    /// Classify a git transport error stream into a user-facing reason.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("not found")
            || lower.contains("does not exist")
            || (lower.contains("repository") && lower.contains("disappeared"))
        {
            Self::NotFound
        } else if lower.contains("permission denied")
            || lower.contains("authentication failed")
            || lower.contains("access denied")
            || lower.contains("403")
        {
            Self::PermissionDenied
        } else if lower.contains("timed out") || lower.contains("timeout") {
            Self::Timeout
        } else if lower.contains("could not resolve host")
            || lower.contains("unable to access")
            || lower.contains("connection refused")
            || lower.contains("network")
        {
            Self::Network
        } else {
            Self::Other
        }
    }

    /// Short user-facing description of the failure.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotFound => "repository not found",
            Self::PermissionDenied => "access to the repository was denied",
            Self::Timeout => "the remote timed out",
            Self::Network => "a network failure occurred",
            Self::Other => "the repository could not be cloned",
        }
    }
}

/// Typed error produced by any pipeline stage.
///
/// The variants mirror the error taxonomy the transport layer exposes.
/// Language evidence rides along on `NoSolutionOrProject` so the caller can
/// tell the user what the repository actually contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Remote unreachable, not found, access denied, or network failure.
    CloneFailed {
        reason: CloneFailureReason,
        message: String,
    },
    /// The fetch wall-clock budget elapsed.
    Timeout { budget_secs: u64 },
    /// No solution or project manifest of an analyzable type was found.
    NoSolutionOrProject {
        detected_languages: Vec<String>,
        found_files: Vec<String>,
    },
    /// File count, source size, or edge count exceeded a safety cap.
    LimitsExceeded { message: String },
    /// All projects were filtered out (test-only, wrong language, empty).
    NoSuitableProjects,
    /// A required framework/SDK reference could not be resolved.
    MissingSdk { target: Option<String> },
    /// Every project failed to produce a compilation.
    BuildFailed { hint: String },
    /// Any unclassified failure.
    Internal(String),
}

impl AnalysisError {
    pub fn clone_failed(reason: CloneFailureReason, message: impl Into<String>) -> Self {
        Self::CloneFailed {
            reason,
            message: message.into(),
        }
    }

    pub fn timeout(budget_secs: u64) -> Self {
        Self::Timeout { budget_secs }
    }

    pub fn limits(message: impl Into<String>) -> Self {
        Self::LimitsExceeded {
            message: message.into(),
        }
    }

    pub fn build_failed(hint: impl Into<String>) -> Self {
        Self::BuildFailed { hint: hint.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wire-level error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CloneFailed { .. } => "CloneFailed",
            Self::Timeout { .. } => "Timeout",
            Self::NoSolutionOrProject { .. } => "NoSolutionOrProject",
            Self::LimitsExceeded { .. } => "LimitsExceeded",
            Self::NoSuitableProjects => "NoSuitableProjects",
            Self::MissingSdk { .. } => "MissingSdk",
            Self::BuildFailed { .. } => "BuildFailed",
            Self::Internal(_) => "InternalError",
        }
    }

    /// HTTP status the transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NoSolutionOrProject { .. } => 400,
            Self::MissingSdk { .. } => 412,
            Self::LimitsExceeded { .. } => 413,
            Self::NoSuitableProjects => 422,
            Self::BuildFailed { .. } => 424,
            Self::Internal(_) => 500,
            Self::CloneFailed { .. } => 502,
            Self::Timeout { .. } => 504,
        }
    }

    /// Serializable error body for the transport layer.
    pub fn to_body(&self) -> ErrorBody {
        let (detected_languages, found_files) = match self {
            Self::NoSolutionOrProject {
                detected_languages,
                found_files,
            } => (
                Some(detected_languages.clone()),
                Some(found_files.clone()),
            ),
            _ => (None, None),
        };
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            detected_languages,
            found_files,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloneFailed { reason, message } => {
                write!(f, "Clone failed: {}", reason.describe())?;
                if !message.is_empty() {
                    write!(f, " ({message})")?;
                }
                Ok(())
            }
            Self::Timeout { budget_secs } => {
                write!(f, "Repository fetch exceeded the {budget_secs}s budget")
            }
            Self::NoSolutionOrProject {
                detected_languages, ..
            } => {
                write!(f, "No .NET solution or project found")?;
                if !detected_languages.is_empty() {
                    write!(f, " (detected: {})", detected_languages.join(", "))?;
                }
                Ok(())
            }
            Self::LimitsExceeded { message } => {
                write!(f, "Analysis limits exceeded: {message}")
            }
            Self::NoSuitableProjects => {
                write!(
                    f,
                    "All projects were filtered out (test-only or non-C# projects)"
                )
            }
            Self::MissingSdk { target } => {
                write!(f, "A required SDK or framework reference is unresolved")?;
                if let Some(t) = target {
                    write!(f, " (target: {t})")?;
                }
                Ok(())
            }
            Self::BuildFailed { hint } => {
                write!(f, "No project produced a compilation. {hint}")
            }
            Self::Internal(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<io::Error> for AnalysisError {
    fn from(err: io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Wire shape of an analysis failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_languages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_files: Option<Vec<String>>,
}
