// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Middleware applied around route handlers.
//!
//! App-wide chain, outermost first: [`logger`], [`errors`], [`metrics`].
//! Route chains add [`authenticate`] and [`authorize`] as needed.

mod auth;
mod errors;
mod logger;
mod metrics;

pub use auth::{authenticate, authorize};
pub use errors::errors;
pub use logger::logger;
pub use metrics::{metrics, Metrics, MetricsSnapshot};
