// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use serde::Serialize;

use crate::web::{middleware, BoxFuture, Handler, HandlerResult, Middleware, RequestContext};

/// In-process request counters.
#[derive(Debug, Default)]
pub struct Metrics {
    requests: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Count every request, and every request whose handler returned an error.
///
/// Sits inside [`errors`](super::errors) so failures are seen before they
/// are translated into responses.
pub fn metrics(metrics: Arc<Metrics>) -> Middleware {
    middleware(move |next: Handler| {
        let metrics = Arc::clone(&metrics);
        let h: Handler = Arc::new(
            move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
                let metrics = Arc::clone(&metrics);
                let next = Arc::clone(&next);
                Box::pin(async move {
                    let result = next(ctx, request).await;

                    metrics.requests.fetch_add(1, Ordering::Relaxed);
                    if result.is_err() {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                    }

                    result
                })
            },
        );
        h
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::web::{handler, wrap_middleware};
    use axum::{body::Body, http::StatusCode, response::IntoResponse};

    async fn ok(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Ok(StatusCode::OK.into_response())
    }

    async fn fail(_ctx: RequestContext, _request: Request) -> HandlerResult {
        Err(Error::internal("boom"))
    }

    fn request() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn counts_requests_and_errors() {
        let counters = Arc::new(Metrics::new());
        let ok_chain = wrap_middleware(&[metrics(counters.clone())], handler(ok));
        let fail_chain = wrap_middleware(&[metrics(counters.clone())], handler(fail));

        ok_chain(RequestContext::new(), request()).await.unwrap();
        ok_chain(RequestContext::new(), request()).await.unwrap();
        fail_chain(RequestContext::new(), request()).await.unwrap_err();

        assert_eq!(
            counters.snapshot(),
            MetricsSnapshot {
                requests: 3,
                errors: 1
            }
        );
    }
}
