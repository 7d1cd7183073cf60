// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware.

use std::sync::Arc;

use axum::{extract::Request, http::header::AUTHORIZATION};

use crate::auth::{AuthError, Authenticator, Role};
use crate::error::{ApiError, Error};
use crate::web::{middleware, BoxFuture, Handler, HandlerResult, Middleware, RequestContext};

/// Validate the bearer token in the `Authorization` header and place its
/// claims in the request context.
///
/// The next handler is only called once the token verified; its result is
/// returned unchanged.
pub fn authenticate(auth: Arc<Authenticator>) -> Middleware {
    middleware(move |next: Handler| {
        let auth = Arc::clone(&auth);
        let h: Handler = Arc::new(
            move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
                let auth = Arc::clone(&auth);
                let next = Arc::clone(&next);
                Box::pin(async move {
                    let token = bearer_token(&request)?;

                    let claims = auth.validate_token(token).map_err(|err| {
                        tracing::debug!(
                            trace_id = %ctx.trace_id(),
                            error_code = err.error_code(),
                            error = %err,
                            "Token rejected"
                        );
                        Error::from(err)
                    })?;

                    next(ctx.with_claims(claims), request).await
                })
            },
        );
        h
    })
}

/// Only let callers holding at least one of `roles` through.
///
/// # Panics
///
/// Panics when `roles` is empty. A route guarded by no roles could never be
/// satisfied, so this is treated as a wiring mistake caught at startup.
pub fn authorize(roles: &[Role]) -> Middleware {
    assert!(
        !roles.is_empty(),
        "authorize middleware requires at least one role"
    );
    let required: Arc<[Role]> = roles.into();

    middleware(move |next: Handler| {
        let required = Arc::clone(&required);
        let h: Handler = Arc::new(
            move |ctx: RequestContext, request: Request| -> BoxFuture<HandlerResult> {
                let required = Arc::clone(&required);
                let next = Arc::clone(&next);
                Box::pin(async move {
                    let claims = ctx.claims().map_err(ApiError::from)?;

                    if !claims.authorized(&required) {
                        return Err(Error::from(AuthError::Forbidden {
                            roles: claims.roles.clone(),
                            required: required.to_vec(),
                        }));
                    }

                    next(ctx, request).await
                })
            },
        );
        h
    })
}

/// Expecting `bearer <token>`: a case-insensitive scheme and exactly one
/// token segment.
fn bearer_token(request: &Request) -> Result<&str, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let parts: Vec<&str> = header.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        _ => Err(AuthError::InvalidAuthHeader.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, KeyLookup, KeyStore, KeyStoreError, PrivateKey};
    use crate::web::{handler, respond, wrap_middleware};
    use axum::{body::Body, http::StatusCode};
    use chrono::{Duration, Utc};
    use jsonwebtoken::{DecodingKey, EncodingKey};

    const KID: &str = "k1";

    fn authenticator() -> Arc<Authenticator> {
        let store = KeyStore::new();
        store.add(KID, PrivateKey::generate());
        Arc::new(Authenticator::new(KID, Arc::new(store)).unwrap())
    }

    fn token(auth: &Authenticator, roles: Vec<Role>) -> String {
        let claims = Claims::new("service project", "u1", roles, Utc::now(), Duration::hours(1));
        auth.generate_token(&claims).unwrap()
    }

    /// Echoes the subject and roles it finds in the context.
    async fn whoami(ctx: RequestContext, _request: Request) -> HandlerResult {
        let claims = ctx.claims()?;
        Ok(respond(
            StatusCode::OK,
            &serde_json::json!({ "sub": claims.sub, "roles": claims.roles }),
        ))
    }

    fn request_with(authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/v1/testauth");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn status_of(result: HandlerResult) -> StatusCode {
        match result {
            Ok(response) => response.status(),
            Err(Error::Request(api)) => api.status,
            Err(other) => panic!("unexpected {other:?}"),
        }
    }

    async fn run(mw: &[Middleware], authorization: Option<&str>) -> HandlerResult {
        let chain = wrap_middleware(mw, handler(whoami));
        chain(RequestContext::new(), request_with(authorization)).await
    }

    #[tokio::test]
    async fn basic_scheme_is_unauthorized() {
        let result = run(&[authenticate(authenticator())], Some("Basic xyz")).await;
        assert_eq!(status_of(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let result = run(&[authenticate(authenticator())], None).await;
        assert_eq!(status_of(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_needs_exactly_one_segment() {
        let auth = authenticator();
        let valid = token(&auth, vec![Role::Admin]);

        let two_segments = format!("Bearer {valid} extra");
        for header in ["Bearer", "Bearer ", two_segments.as_str()] {
            let result = run(&[authenticate(Arc::clone(&auth))], Some(header)).await;
            assert_eq!(status_of(result), StatusCode::UNAUTHORIZED, "header {header:?}");
        }
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let result = run(&[authenticate(authenticator())], Some("Bearer not.a.token")).await;
        match result {
            Err(Error::Request(api)) => {
                assert_eq!(api.status, StatusCode::UNAUTHORIZED);
                assert_eq!(api.message, "invalid token");
            }
            other => panic!("unexpected {other:?}"),
        }

        let result = run(&[authenticate(authenticator())], Some("Bearer x")).await;
        match result {
            Err(Error::Request(api)) => assert_eq!(api.message, "invalid token"),
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Signs with a real key but cannot serve public keys.
    struct BrokenLookup(KeyStore);

    impl KeyLookup for BrokenLookup {
        fn private_key(&self, kid: &str) -> Result<EncodingKey, KeyStoreError> {
            self.0.private_key(kid)
        }

        fn public_key(&self, _kid: &str) -> Result<DecodingKey, KeyStoreError> {
            Err(KeyStoreError::InvalidKey("corrupt key material".into()))
        }
    }

    #[tokio::test]
    async fn key_store_fault_is_internal() {
        let store = KeyStore::new();
        store.add(KID, PrivateKey::generate());
        let auth = Arc::new(Authenticator::new(KID, Arc::new(BrokenLookup(store))).unwrap());
        let header = format!("Bearer {}", token(&auth, vec![Role::Admin]));

        let result = run(&[authenticate(auth)], Some(&header)).await;
        match result {
            Err(err @ Error::Internal(_)) => {
                let (status, body) = err.response_parts();
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error, "Internal Server Error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_token_puts_claims_in_context() {
        let auth = authenticator();
        let header = format!("bEaReR {}", token(&auth, vec![Role::Admin]));

        let response = run(&[authenticate(auth)], Some(&header)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["sub"], "u1");
        assert_eq!(json["roles"], serde_json::json!(["ADMIN"]));
    }

    #[tokio::test]
    async fn user_role_is_forbidden_for_admin_route() {
        let auth = authenticator();
        let header = format!("Bearer {}", token(&auth, vec![Role::User]));

        let result = run(
            &[authenticate(auth), authorize(&[Role::Admin])],
            Some(&header),
        )
        .await;
        match result {
            Err(Error::Request(api)) => {
                assert_eq!(api.status, StatusCode::FORBIDDEN);
                assert!(api.message.ends_with("claims[USER] roles[ADMIN]"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn any_matching_role_is_enough() {
        let auth = authenticator();
        let header = format!("Bearer {}", token(&auth, vec![Role::Admin, Role::User]));

        let result = run(
            &[authenticate(auth), authorize(&[Role::Admin])],
            Some(&header),
        )
        .await;
        assert_eq!(status_of(result), StatusCode::OK);
    }

    #[tokio::test]
    async fn authorize_without_claims_is_forbidden() {
        let result = run(&[authorize(&[Role::User])], None).await;
        match result {
            Err(Error::Request(api)) => {
                assert_eq!(api.status, StatusCode::FORBIDDEN);
                assert!(api.message.contains("no claims"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "requires at least one role")]
    fn authorize_rejects_empty_role_list() {
        let _ = authorize(&[]);
    }
}
