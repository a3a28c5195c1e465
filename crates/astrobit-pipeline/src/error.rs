//! Error taxonomy shared by every entry point.

use std::path::PathBuf;

use astrobit_forest::ForestError;
use astrobit_io::IoError;
use astrobit_render::RenderError;

/// Message returned to callers for any rendering failure.
pub const RENDER_FAILURE_MESSAGE: &str = "failed to render tree image";

/// Errors surfaced by the classification and explanation pipeline.
///
/// Each variant maps to one HTTP status via [`PipelineError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The caller sent a body that cannot be interpreted.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// Loaded artifacts disagree with each other or with the request's shape.
    #[error("configuration mismatch: {reason}")]
    ConfigMismatch {
        /// Which dimensions or names disagreed.
        reason: String,
    },

    /// An artifact file does not exist.
    #[error("{artifact} artifact not found at {path}")]
    ArtifactMissing {
        /// Which artifact (`model`, `scaler`, `labels`, `metrics`).
        artifact: &'static str,
        /// Path that was tried.
        path: PathBuf,
    },

    /// An artifact file exists but could not be parsed or validated.
    #[error("{artifact} artifact at {path} is unusable")]
    CorruptArtifact {
        /// Which artifact.
        artifact: &'static str,
        /// Path that was read.
        path: PathBuf,
        /// Underlying loader error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Drawing a tree failed.
    #[error("failed to render tree image")]
    RenderingFailure {
        /// Underlying renderer error.
        #[source]
        source: RenderError,
    },
}

impl PipelineError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::InvalidRequest { .. } => 400,
            PipelineError::ArtifactMissing { .. } => 404,
            PipelineError::ConfigMismatch { .. }
            | PipelineError::CorruptArtifact { .. }
            | PipelineError::RenderingFailure { .. } => 500,
        }
    }

    /// Build the error for a failed artifact load, splitting absence from corruption.
    pub(crate) fn artifact<E>(artifact: &'static str, path: PathBuf, not_found: bool, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if not_found {
            PipelineError::ArtifactMissing { artifact, path }
        } else {
            PipelineError::CorruptArtifact {
                artifact,
                path,
                source: Box::new(source),
            }
        }
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        PipelineError::InvalidRequest {
            reason: reason.into(),
        }
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::InvalidTable { .. } | IoError::InvalidMapping { .. } => {
                PipelineError::InvalidRequest {
                    reason: e.to_string(),
                }
            }
            other => PipelineError::ConfigMismatch {
                reason: other.to_string(),
            },
        }
    }
}

impl From<ForestError> for PipelineError {
    fn from(e: ForestError) -> Self {
        PipelineError::ConfigMismatch {
            reason: e.to_string(),
        }
    }
}

impl From<RenderError> for PipelineError {
    fn from(source: RenderError) -> Self {
        PipelineError::RenderingFailure { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(PipelineError::invalid_request("x").status_code(), 400);
        assert_eq!(
            PipelineError::from(ForestError::TreeIndexOutOfRange {
                index: 9,
                n_trees: 3
            })
            .status_code(),
            500
        );
        assert_eq!(
            PipelineError::ArtifactMissing {
                artifact: "metrics",
                path: "m.json".into()
            }
            .status_code(),
            404
        );
    }

    #[test]
    fn malformed_table_is_invalid_request() {
        let e = PipelineError::from(IoError::InvalidTable {
            reason: "not an array".into(),
        });
        assert!(matches!(e, PipelineError::InvalidRequest { .. }));
    }

    #[test]
    fn scaler_mismatch_is_config_mismatch() {
        let e = PipelineError::from(IoError::ScalerDimensionMismatch {
            expected: 7,
            got: 6,
        });
        assert!(matches!(e, PipelineError::ConfigMismatch { .. }));
    }

    #[test]
    fn scaling_overflow_is_500() {
        let e = PipelineError::from(IoError::NonFiniteValue {
            row_index: 0,
            col_index: 0,
        });
        assert!(matches!(e, PipelineError::ConfigMismatch { .. }));
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn render_failure_hides_detail() {
        let e = PipelineError::from(RenderError::MissingNode { node: 3 });
        assert_eq!(e.to_string(), RENDER_FAILURE_MESSAGE);
        assert_eq!(e.status_code(), 500);
    }
}
