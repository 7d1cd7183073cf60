// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request logging middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};

use crate::web::{middleware, BoxFuture, Handler, HandlerResult, Middleware, RequestContext};

/// Log the start and completion of every request with its trace id.
pub fn logger() -> Middleware {
    middleware(|next: Handler| {
        let h: Handler = Arc::new(
            move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
                let next = Arc::clone(&next);
                Box::pin(async move {
                    let trace_id = ctx.trace_id();
                    let started = ctx.values().now;
                    let method = request.method().clone();
                    let path = request.uri().path().to_owned();
                    let remote_addr = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    tracing::info!(
                        trace_id = %trace_id,
                        method = %method,
                        path = %path,
                        remote_addr = %remote_addr,
                        "Request started"
                    );

                    let result = next(ctx, request).await;

                    let elapsed_ms = (chrono::Utc::now() - started).num_milliseconds();
                    match &result {
                        Ok(response) => tracing::info!(
                            trace_id = %trace_id,
                            method = %method,
                            path = %path,
                            remote_addr = %remote_addr,
                            status = response.status().as_u16(),
                            elapsed_ms,
                            "Request completed"
                        ),
                        Err(err) => tracing::info!(
                            trace_id = %trace_id,
                            method = %method,
                            path = %path,
                            remote_addr = %remote_addr,
                            status = err.response_parts().0.as_u16(),
                            elapsed_ms,
                            "Request completed with error"
                        ),
                    }

                    result
                })
            },
        );
        h
    })
}
