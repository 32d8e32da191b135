use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::garden::Stage;

/// Everything a garden operation can fail with.
///
/// All variants except `Store` are raised by precondition checks before any
/// write is staged, so a failed operation never leaves partial state behind.
#[derive(Debug, Error)]
pub enum GardenError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("plant limit reached ({limit})")]
    PlantLimitReached { limit: i32 },

    #[error("cannot {action} a plant at stage {stage}")]
    InvalidStage { action: &'static str, stage: Stage },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("username already taken")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type GardenResult<T> = Result<T, GardenError>;

impl GardenError {
    pub fn status(&self) -> StatusCode {
        match self {
            GardenError::InsufficientFunds { .. }
            | GardenError::PlantLimitReached { .. }
            | GardenError::InvalidStage { .. }
            | GardenError::UsernameTaken
            | GardenError::EmailTaken => StatusCode::CONFLICT,
            GardenError::NotFound(_) => StatusCode::NOT_FOUND,
            GardenError::Validation(_) => StatusCode::BAD_REQUEST,
            GardenError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GardenError> for (StatusCode, String) {
    fn from(e: GardenError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            error!(error = ?e, "store failure");
            return (status, "internal error".into());
        }
        (status, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let (status, msg): (StatusCode, String) = GardenError::InsufficientFunds {
            needed: 100,
            available: 40,
        }
        .into();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(msg, "insufficient funds: need 100, have 40");

        let (status, _): (StatusCode, String) = GardenError::NotFound("plant").into();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _): (StatusCode, String) = GardenError::Validation("bad".into()).into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_hide_details() {
        let err = GardenError::from(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let (status, msg): (StatusCode, String) = err.into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!msg.contains("10.0.0.3"));
    }

    #[test]
    fn invalid_stage_message_names_the_action() {
        let err = GardenError::InvalidStage {
            action: "water",
            stage: Stage::Sprout,
        };
        assert_eq!(err.to_string(), "cannot water a plant at stage 1");
    }
}
