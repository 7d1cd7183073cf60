// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Small handler/middleware layer on top of axum.
//!
//! A [`Handler`] takes the request context and the request and returns a
//! response or an [`Error`]. A [`Middleware`] turns one handler into another.
//! Chains are composed once, when a route is registered:
//!
//! ```rust,ignore
//! let app = App::new(shutdown, vec![mid::logger(), mid::errors()])
//!     .handle(
//!         MethodFilter::GET,
//!         "/v1/testauth",
//!         web::handler(test::test_auth),
//!         &[mid::authenticate(auth), mid::authorize(&[Role::Admin])],
//!     );
//! ```

pub mod context;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

pub use context::{RequestContext, Values};

use crate::error::{ApiError, Error};
use crate::validate::Validate;

/// Boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What every handler in a chain returns.
pub type HandlerResult = Result<Response, Error>;

/// A request handler: `(context, request) -> response | error`.
pub type Handler = Arc<dyn Fn(RequestContext, Request) -> BoxFuture<HandlerResult> + Send + Sync>;

/// Wraps a handler to produce a new handler.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Lift an async function into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
            Box::pin(f(ctx, request))
        },
    )
}

/// Lift a handler transformer into a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap `handler` so that `mw[0]` runs first and `handler` runs last.
pub fn wrap_middleware(mw: &[Middleware], handler: Handler) -> Handler {
    mw.iter().rev().fold(handler, |h, m| m(h))
}

/// JSON response with `status`; `204 No Content` carries no body.
pub fn respond<T: Serialize>(status: StatusCode, data: &T) -> Response {
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(data)).into_response()
}

/// Decode a JSON request body and run its field checks.
pub async fn decode<T>(request: Request) -> Result<T, Error>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = Json::<T>::from_request(request, &())
        .await
        .map_err(|rejection| {
            ApiError::new(
                rejection.status(),
                format!("unable to decode payload: {}", rejection.body_text()),
            )
        })?;

    value.validate()?;
    Ok(value)
}

/// Route table plus the app-wide middleware every route runs through.
///
/// An error that escapes the full chain is answered with whatever response
/// the error middleware recorded. A shutdown error additionally cancels the
/// service's shutdown token.
pub struct App {
    router: Router,
    shutdown: CancellationToken,
    mw: Vec<Middleware>,
}

impl App {
    pub fn new(shutdown: CancellationToken, mw: Vec<Middleware>) -> Self {
        Self {
            router: Router::new(),
            shutdown,
            mw,
        }
    }

    /// Register `handler` for `method` on `path`, wrapped first in
    /// `route_mw` and then in the app-wide middleware.
    pub fn handle(
        mut self,
        method: MethodFilter,
        path: &str,
        handler: Handler,
        route_mw: &[Middleware],
    ) -> Self {
        let chain = wrap_middleware(&self.mw, wrap_middleware(route_mw, handler));
        let shutdown = self.shutdown.clone();

        let route = move |request: Request| {
            let chain = Arc::clone(&chain);
            let shutdown = shutdown.clone();
            async move {
                match chain(RequestContext::new(), request).await {
                    Ok(response) => response,
                    Err(err) => escaped(err, &shutdown),
                }
            }
        };

        self.router = self.router.route(path, on(method, route));
        self
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

fn escaped(err: Error, shutdown: &CancellationToken) -> Response {
    match err {
        Error::Shutdown(shutdown_err) => {
            tracing::error!(
                reason = %shutdown_err.message,
                "Handler requested service shutdown"
            );
            shutdown.cancel();
            shutdown_err.into_response()
        }
        other => {
            tracing::error!(error = %other, "Error escaped the middleware chain");
            let (status, body) = other.response_parts();
            (status, Json(body)).into_response()
        }
    }
}
