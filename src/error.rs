// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handler error types.
//!
//! Every handler in the middleware chain returns [`Error`]. The error
//! middleware classifies it exactly once:
//!
//! | Variant | Client response |
//! |---------|-----------------|
//! | [`Error::Fields`] | 400 with per-field messages |
//! | [`Error::Request`] | the status and message the [`ApiError`] carries |
//! | [`Error::Shutdown`] | 500, then re-raised to stop the service |
//! | [`Error::Internal`] | 500, error text only in logs |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;

/// A request error carrying the status code the client should see.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.client_message())
    }
}

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// A collection of failed field checks on a decoded payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("data validation error: {}", summary(.0))]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: impl Into<String>, error: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            error: error.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when no field failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn summary(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error value that asks the service to shut down gracefully.
///
/// Once the error middleware has answered the client it records the
/// response here so the outermost layer can still deliver it.
#[derive(Debug, Error)]
#[error("shutdown requested: {message}")]
pub struct ShutdownError {
    pub message: String,
    responded: Option<(StatusCode, ErrorResponse)>,
}

impl ShutdownError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            responded: None,
        }
    }

    /// Attach the response already produced for the client.
    pub fn responded(mut self, status: StatusCode, body: ErrorResponse) -> Self {
        self.responded = Some((status, body));
        self
    }

    /// Whether a client response has been produced.
    pub fn has_responded(&self) -> bool {
        self.responded.is_some()
    }
}

impl IntoResponse for ShutdownError {
    fn into_response(self) -> Response {
        let (status, body) = self.responded.unwrap_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal(),
            )
        });
        (status, Json(body)).into_response()
    }
}

/// Error returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fields(#[from] FieldErrors),

    #[error(transparent)]
    Request(#[from] ApiError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    #[error("{0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an unclassified error; its text is never shown to clients.
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal(err.into())
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown(ShutdownError::new(message))
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// Status and body the client sees for this error.
    pub fn response_parts(&self) -> (StatusCode, ErrorResponse) {
        match self {
            Self::Fields(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "data validation error".to_string(),
                    fields: Some(fields.0.clone()),
                },
            ),
            Self::Request(api) => (api.status, ErrorResponse::new(api.message.clone())),
            Self::Shutdown(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal())
            }
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        if err.status_code().is_server_error() {
            Self::internal(err)
        } else {
            Self::Request(err.into())
        }
    }
}

/// Uniform JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }

    /// Opaque body for unclassified failures.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or("Internal Server Error"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let unauth = ApiError::unauthorized("who");
        assert_eq!(unauth.status, StatusCode::UNAUTHORIZED);

        let forbidden = ApiError::forbidden("no");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn auth_errors_keep_their_status() {
        let err: Error = AuthError::InvalidAuthHeader.into();
        match err {
            Error::Request(api) => assert_eq!(api.status, StatusCode::UNAUTHORIZED),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn field_errors_collect_and_summarize() {
        let mut fields = FieldErrors::new();
        assert!(fields.clone().into_result().is_ok());

        fields.add("email", "must be a valid email address");
        fields.add("password", "is required");
        let err = fields.into_result().unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert_eq!(
            err.to_string(),
            "data validation error: email: must be a valid email address, password: is required"
        );
    }

    #[tokio::test]
    async fn shutdown_without_response_renders_opaque_500() {
        let response = ShutdownError::new("integrity check failed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn response_parts_classify_each_variant() {
        let mut fields = FieldErrors::new();
        fields.add("email", "is required");
        let (status, body) = Error::from(fields).response_parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "data validation error");
        assert_eq!(body.fields.unwrap()[0].field, "email");

        let (status, body) = Error::from(ApiError::not_found("user not found")).response_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "user not found");

        let (status, body) = Error::internal("db password is hunter2").response_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
    }

    #[test]
    fn shutdown_is_detected() {
        assert!(Error::shutdown("stop").is_shutdown());
        assert!(!Error::internal("boom").is_shutdown());
    }
}
