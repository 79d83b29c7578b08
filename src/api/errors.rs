use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::error::SessionError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(message) => ApiError::NotFound(message),
            SessionError::Forbidden(message) => ApiError::Forbidden(message),
            SessionError::Conflict(message) => ApiError::Conflict(message),
            SessionError::Validation(message) => ApiError::BadRequest(message),
            SessionError::Database { context, source } => ApiError::internal(source, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::ApiError;
    use crate::services::error::SessionError;

    #[test]
    fn session_errors_map_to_status_codes() {
        let cases = [
            (SessionError::not_found("Session not found"), StatusCode::NOT_FOUND),
            (SessionError::Forbidden("nope"), StatusCode::FORBIDDEN),
            (SessionError::conflict("busy"), StatusCode::CONFLICT),
            (SessionError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                SessionError::Database { context: "Failed", source: sqlx::Error::RowNotFound },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn client_errors_render_status_and_detail() {
        let cases = [
            (ApiError::Unauthorized("Missing token"), StatusCode::UNAUTHORIZED, "Missing token"),
            (
                ApiError::TooManyRequests("Too many saves, try again shortly"),
                StatusCode::TOO_MANY_REQUESTS,
                "Too many saves, try again shortly",
            ),
            (ApiError::BadRequest("bad".to_string()), StatusCode::BAD_REQUEST, "bad"),
        ];

        for (err, expected, detail) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
            let body = crate::test_support::read_json(response).await;
            assert_eq!(body["status"], expected.as_u16());
            assert_eq!(body["detail"], detail);
        }
    }
}
