// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Taju-Uploader: log Strava runs to the Taji100 challenge
//!
//! This crate keeps a participant's Taji100 log in step with their Strava
//! runs. Every cycle it fetches runs from Strava, scrapes the entries
//! already logged on Taji100 and submits the runs that are missing.

pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
