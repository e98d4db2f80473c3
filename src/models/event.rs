// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Entries already logged on Taji100.

/// One logged entry, as rendered by the sink's edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEvent {
    /// Date of the checked option (`2025-02-10`)
    pub date: String,
    /// Value of the `time` input (`02:30:PM`)
    pub time: String,
}

impl SinkEvent {
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
        }
    }
}
