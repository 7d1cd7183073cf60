// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error translation middleware.

use std::sync::Arc;

use axum::{extract::Request, response::IntoResponse, Json};

use crate::error::Error;
use crate::web::{middleware, BoxFuture, Handler, HandlerResult, Middleware, RequestContext};

/// Turn errors coming out of the chain into uniform client responses.
///
/// Every error is logged with the request's trace id and answered once.
/// A shutdown error is answered and then returned to the caller, carrying
/// the response so the outermost layer can still deliver it.
pub fn errors() -> Middleware {
    middleware(|next: Handler| {
        let h: Handler = Arc::new(
            move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
                let next = Arc::clone(&next);
                Box::pin(async move {
                    let trace_id = ctx.trace_id();

                    let err = match next(ctx, request).await {
                        Ok(response) => return Ok(response),
                        Err(err) => err,
                    };

                    match &err {
                        Error::Internal(source) => tracing::error!(
                            trace_id = %trace_id,
                            error = %source,
                            "Request failed"
                        ),
                        other => tracing::warn!(
                            trace_id = %trace_id,
                            error = %other,
                            "Request failed"
                        ),
                    }

                    let (status, body) = err.response_parts();
                    match err {
                        Error::Shutdown(shutdown) => {
                            Err(Error::Shutdown(shutdown.responded(status, body)))
                        }
                        _ => Ok((status, Json(body)).into_response()),
                    }
                })
            },
        );
        h
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ErrorResponse, FieldErrors};
    use crate::web::{handler, wrap_middleware};
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
        response::Response,
    };

    async fn invalid_fields(_ctx: RequestContext, _request: Request) -> HandlerResult {
        let mut fields = FieldErrors::new();
        fields.add("email", "must be a valid email address");
        fields.add("password", "is required");
        Err(fields.into())
    }

    async fn missing_user(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Err(ApiError::not_found("user not found").into())
    }

    async fn broken_store(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Err(Error::internal("connection refused: postgres://admin:secret@db"))
    }

    async fn integrity_failure(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Err(Error::shutdown("integrity check failed"))
    }

    async fn ok(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn call(h: Handler) -> HandlerResult {
        let chain = wrap_middleware(&[errors()], h);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        chain(RequestContext::new(), request).await
    }

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_passes_through() {
        let response = call(handler(ok)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn field_errors_become_400_with_every_field() {
        let response = call(handler(invalid_fields)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body.error, "data validation error");
        let fields: Vec<String> = body.fields.unwrap().into_iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[tokio::test]
    async fn request_error_keeps_its_status_and_message() {
        let response = call(handler(missing_user)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await.error, "user not found");
    }

    #[tokio::test]
    async fn unclassified_error_is_opaque() {
        let response = call(handler(broken_store)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body.error, "Internal Server Error");
        assert!(body.fields.is_none());
    }

    #[tokio::test]
    async fn shutdown_is_answered_and_propagated() {
        let err = call(handler(integrity_failure)).await.unwrap_err();

        let Error::Shutdown(shutdown) = err else {
            panic!("shutdown error was swallowed");
        };
        assert!(shutdown.has_responded());

        let response = shutdown.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.error, "Internal Server Error");
    }
}
