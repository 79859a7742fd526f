// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (signature verification, security headers).

pub mod security;
pub mod signature;

pub use signature::require_signature;
