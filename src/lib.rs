// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sales API - Token-issuing authentication service
//!
//! This crate issues EdDSA-signed bearer tokens, verifies them on inbound
//! requests and enforces role-based access before handlers run.
//!
//! ## Modules
//!
//! - `auth` - Key lookup, token signing/verification, claims and roles
//! - `web` - Handler/middleware composition on top of Axum
//! - `mid` - Authentication, authorization, error, logging and metrics middleware
//! - `api` - HTTP route registration (`/v1/...`)
//! - `users` - Credential verification behind the token endpoint

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod mid;
pub mod users;
pub mod validate;
pub mod web;
