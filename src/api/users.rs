// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints: token issuing and caller identity.

use std::sync::Arc;

use axum::{extract::Request, http::StatusCode};
use serde::Serialize;

use crate::auth::{Authenticator, Role};
use crate::error::{ApiError, Error};
use crate::users::{CredentialError, CredentialVerifier, Credentials};
use crate::web::{decode, respond, HandlerResult, RequestContext};

/// Response of `POST /v1/users/token`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Response of `GET /v1/users/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub sub: String,
    pub roles: Vec<Role>,
}

/// Dependencies of the token endpoint.
#[derive(Clone)]
pub struct Handlers {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub auth: Arc<Authenticator>,
}

impl Handlers {
    /// Exchange an email/password pair for a signed token.
    pub async fn token(self, ctx: RequestContext, request: Request) -> HandlerResult {
        let creds: Credentials = decode(request).await?;

        let claims = self
            .verifier
            .authenticate(&creds.email, &creds.password, ctx.values().now)
            .await
            .map_err(|err| match err {
                CredentialError::NotFound | CredentialError::AuthenticationFailure => {
                    tracing::info!(trace_id = %ctx.trace_id(), reason = %err, "Login rejected");
                    Error::from(ApiError::unauthorized("authentication failed"))
                }
                CredentialError::Store(source) => Error::Internal(source),
                CredentialError::Hash(source) => Error::internal(source),
            })?;

        let token = self.auth.generate_token(&claims).map_err(Error::internal)?;

        Ok(respond(StatusCode::OK, &TokenResponse { token }))
    }
}

/// Subject and roles of the authenticated caller.
pub async fn me(ctx: RequestContext, _request: Request) -> HandlerResult {
    let claims = ctx.claims()?;
    Ok(respond(
        StatusCode::OK,
        &MeResponse {
            sub: claims.sub.clone(),
            roles: claims.roles.clone(),
        },
    ))
}
