// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped values passed down the handler chain.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AuthError, Claims};

/// Metadata stamped on every request when it enters the service.
#[derive(Debug, Clone)]
pub struct Values {
    /// Identifier correlating every log line of one request
    pub trace_id: Uuid,
    /// When the request entered the service
    pub now: DateTime<Utc>,
}

impl Values {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            now: Utc::now(),
        }
    }
}

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed from middleware to middleware and finally to the handler.
///
/// Immutable: attaching claims produces a new context for the next handler,
/// the caller's copy is left untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<Values>,
    claims: Option<Arc<Claims>>,
}

impl RequestContext {
    /// Fresh context with a new trace id.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn trace_id(&self) -> Uuid {
        self.values.trace_id
    }

    /// Context carrying `claims` for downstream handlers.
    pub fn with_claims(&self, claims: Claims) -> Self {
        Self {
            values: Arc::clone(&self.values),
            claims: Some(Arc::new(claims)),
        }
    }

    /// Claims placed by the authentication middleware.
    pub fn claims(&self) -> Result<&Claims, AuthError> {
        self.claims.as_deref().ok_or(AuthError::MissingClaims)
    }
}
