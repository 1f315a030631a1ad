use crate::recommendation::RecommendationStage;
use crate::types::{ApiResponse, RoomId};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, RecommendationError>;

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Room {0} not found or not available")]
    TargetNotFound(RoomId),

    /// Handled inside the orchestrator; callers receive an empty result list
    #[error("No eligible candidates for room {0}")]
    NoCandidates(RoomId),

    #[error("{component} failed during {stage}: {message}")]
    UpstreamStore {
        component: &'static str,
        stage: RecommendationStage,
        message: String,
    },

    #[error("Failed to record click event: {0}")]
    FeedbackRecording(String),

    #[error("Recommendation timed out during {stage}")]
    Timeout { stage: RecommendationStage },

    #[error("Recommendation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommendationError {
    /// Attach the failing component and stage to a collaborator error
    pub fn upstream(
        component: &'static str,
        stage: RecommendationStage,
        err: StoreError,
    ) -> Self {
        RecommendationError::UpstreamStore {
            component,
            stage,
            message: err.to_string(),
        }
    }
}

impl ResponseError for RecommendationError {
    fn status_code(&self) -> StatusCode {
        match self {
            RecommendationError::Validation(_) => StatusCode::BAD_REQUEST,
            RecommendationError::TargetNotFound(_) => StatusCode::NOT_FOUND,
            RecommendationError::UpstreamStore { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RecommendationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RecommendationError::NoCandidates(_)
            | RecommendationError::FeedbackRecording(_)
            | RecommendationError::Cancelled
            | RecommendationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
    }
}

/// Failure reported by a collaborator store adapter
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to decode row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_) => StoreError::Decode(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}
