//! Build status lookup against AWS CodeBuild.

use async_trait::async_trait;
use thiserror::Error;

/// Lifecycle state of a CodeBuild build.
///
/// CodeBuild also reports statuses this tool does not act on (`FAULT`,
/// `TIMED_OUT`, ...); those are carried through as [`BuildStatus::Unknown`]
/// with the raw token preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    InProgress,
    Succeeded,
    Failed,
    Stopped,
    Unknown(String),
}

impl BuildStatus {
    /// Whether the build has finished. Unknown statuses are treated as
    /// terminal so the poll loop cannot spin on a token it does not model.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Errors from a status lookup.
///
/// `NotFound` and `Fetch` are both "cannot proceed" outcomes for the
/// caller, but they are logged differently for operability.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("no build found with id {0}")]
    NotFound(String),

    #[error("failed to fetch build status: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Source of build statuses. Seam between the poll loop and AWS.
#[async_trait]
pub trait BuildStatusSource: Send + Sync {
    async fn build_status(&self, build_id: &str) -> Result<BuildStatus, StatusError>;
}

/// Status source backed by the CodeBuild `BatchGetBuilds` API.
pub struct CodeBuildClient {
    client: aws_sdk_codebuild::Client,
}

impl CodeBuildClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_codebuild::Client::new(config),
        }
    }
}

#[async_trait]
impl BuildStatusSource for CodeBuildClient {
    /// Look up the current status of one build. A single failed call is
    /// final; there is no retry at this layer.
    async fn build_status(&self, build_id: &str) -> Result<BuildStatus, StatusError> {
        let output = self
            .client
            .batch_get_builds()
            .ids(build_id)
            .send()
            .await
            .map_err(|e| StatusError::Fetch(Box::new(e)))?;

        match output.builds().first().and_then(|build| build.build_status()) {
            Some(status) => Ok(BuildStatus::from(status.as_str())),
            None => Err(StatusError::NotFound(build_id.to_string())),
        }
    }
}
