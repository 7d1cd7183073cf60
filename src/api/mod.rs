// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{routing::MethodFilter, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    auth::{Authenticator, Role},
    mid::{self, Metrics},
    users::CredentialVerifier,
    web::{self, App},
};

pub mod users;

/// Everything the v1 routes need.
pub struct ApiMuxConfig {
    pub shutdown: CancellationToken,
    pub auth: Arc<Authenticator>,
    /// Token endpoint is only registered when a verifier is present.
    pub verifier: Option<Arc<dyn CredentialVerifier>>,
    pub metrics: Arc<Metrics>,
}

pub fn api_mux(cfg: ApiMuxConfig) -> Router {
    let ApiMuxConfig {
        shutdown,
        auth,
        verifier,
        metrics,
    } = cfg;

    let mut app = App::new(
        shutdown,
        vec![mid::logger(), mid::errors(), mid::metrics(metrics)],
    )
    .handle(MethodFilter::GET, "/v1/test", web::handler(test::test), &[])
    .handle(
        MethodFilter::GET,
        "/v1/testauth",
        web::handler(test::test_auth),
        &[
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(&[Role::Admin]),
        ],
    )
    .handle(
        MethodFilter::GET,
        "/v1/users/me",
        web::handler(users::me),
        &[
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(&[Role::Admin, Role::User]),
        ],
    );

    if let Some(verifier) = verifier {
        let h = users::Handlers { verifier, auth };
        app = app.handle(
            MethodFilter::POST,
            "/v1/users/token",
            web::handler(move |ctx, request| h.clone().token(ctx, request)),
            &[],
        );
    }

    app.into_router().layer(TraceLayer::new_for_http())
}
