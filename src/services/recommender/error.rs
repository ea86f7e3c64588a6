use std::path::PathBuf;

use thiserror::Error;

use crate::models::MovieId;

/// Failures of the recommendation pipeline
///
/// Kinds are kept distinct so the web layer can decide between an error
/// response and a non-personalized fallback.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("Artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Artifact {path} is malformed: {reason}")]
    ArtifactFormat { path: String, reason: String },

    #[error("Feature shape mismatch: classifier expects {expected} columns, got {actual}")]
    FeatureShapeMismatch { expected: usize, actual: usize },

    #[error("No scorable candidates left for user")]
    EmptyCandidateSet,

    #[error("Movie {movie_id} is missing {field}")]
    IncompleteMovieData {
        movie_id: MovieId,
        field: &'static str,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timed out while {0}")]
    Timeout(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Scoring task failed: {0}")]
    ScoringTask(String),
}

impl RecommendError {
    /// Whether the pipeline can continue with a fallback instead of failing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecommendError::EmptyCandidateSet | RecommendError::IncompleteMovieData { .. }
        )
    }

    /// Artifacts and code disagree; needs redeployment rather than a retry
    pub fn is_artifact_fault(&self) -> bool {
        matches!(
            self,
            RecommendError::ArtifactMismatch(_)
                | RecommendError::ArtifactMissing(_)
                | RecommendError::ArtifactFormat { .. }
                | RecommendError::FeatureShapeMismatch { .. }
        )
    }

    pub(crate) fn format(path: impl Into<String>, reason: impl ToString) -> Self {
        RecommendError::ArtifactFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
