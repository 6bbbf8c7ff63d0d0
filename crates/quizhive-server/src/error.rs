use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use quizhive_core::CoreError;
use quizhive_engine::EngineError;

/// HTTP-facing refusals. The variant picks the status, the payload carries
/// the human-readable detail.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
}

impl ApiError {
    pub fn game_not_found() -> Self {
        Self::NotFound("game not found".into())
    }

    pub fn not_host() -> Self {
        Self::Forbidden("only the host may do this".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::GameNotFound(_) => Self::NotFound(message),
            EngineError::GameOver | EngineError::NicknameTaken(_) => Self::Conflict(message),
            EngineError::EmptyQuiz => Self::Unprocessable(message),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidGameCode(_) => Self::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizhive_core::GameCode;

    #[test]
    fn variants_map_to_their_status_codes() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ApiError::Unprocessable("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn engine_errors_convert() {
        let missing = GameCode::parse("AAAAA1").unwrap();
        assert!(matches!(
            ApiError::from(EngineError::GameNotFound(missing)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::GameOver),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::NicknameTaken("ada".into())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::EmptyQuiz),
            ApiError::Unprocessable(_)
        ));
    }

    #[test]
    fn malformed_code_maps_to_not_found() {
        let err = GameCode::parse("nope").unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }
}
