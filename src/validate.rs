// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payload validation.

use crate::error::FieldErrors;

/// Field-level checks run on decoded request payloads.
pub trait Validate {
    /// Check every field, reporting all failures at once.
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Minimal structural email check: one `@` with non-empty local part and a
/// dotted domain.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
