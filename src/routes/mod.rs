// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.
//!
//! The uploader is a client of both sites; the only thing it serves is the
//! OAuth redirect during first-time Strava authorization.

pub mod auth;
