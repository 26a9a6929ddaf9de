use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use comics_dal::ValidationErrors;
use http::{header, StatusCode};
use serde_json::json;
use tracing::{debug, error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("the requested resource could not be found")]
    ResourceNotFound,
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    #[error("failed validation: {0}")]
    FailedValidation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid or missing authentication token")]
    InvalidToken,
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
    #[error("the server encountered a problem and could not process your request")]
    Store(#[source] comics_dal::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ResourceNotFound => StatusCode::NOT_FOUND,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<comics_dal::Error> for ApiError {
    fn from(value: comics_dal::Error) -> Self {
        match value {
            comics_dal::Error::RecordNotFound(_) => ApiError::ResourceNotFound,
            comics_dal::Error::EditConflict { .. } => ApiError::EditConflict,
            other => ApiError::Store(other),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        ApiError::FailedValidation(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        match &self {
            ApiError::Store(e) => error!("Request failed: {e}"),
            other => debug!("Request rejected: {other}"),
        }

        match self {
            ApiError::FailedValidation(errors) => {
                (status, Json(json!({ "error": errors }))).into_response()
            }
            ApiError::InvalidToken => (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "error": message })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_store_errors_mapping() {
        let not_found: ApiError = comics_dal::Error::RecordNotFound("Comic".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let conflict: ApiError = comics_dal::Error::EditConflict { id: 1, version: 2 }.into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let timeout: ApiError = comics_dal::Error::Timeout(Duration::from_secs(3)).into();
        assert_eq!(timeout.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validation_body() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "must be provided");
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({"error": {"title": "must be provided"}})
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err: ApiError = comics_dal::Error::Timeout(Duration::from_millis(10)).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "the server encountered a problem and could not process your request"})
        );
    }

    #[tokio::test]
    async fn test_unauthorized_challenge() {
        let response = ApiError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
