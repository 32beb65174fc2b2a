//
// Copyright © 2023 Arm Limited. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

/// Errors that can occur while reading a trace or drawing its chart
#[derive(Debug, thiserror::Error)]
pub enum GrapherError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An iteration record without a `(t = ...)` group
    #[error("line {line}: iteration record has no timestamp")]
    MissingTimestamp { line: usize },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("line {line}: invalid population count '{value}' for complex {complex}")]
    InvalidCount {
        line: usize,
        complex: String,
        value: String,
    },

    /// A complex requested for plotting never appeared in the trace
    #[error("complex not found in trace: {0}")]
    UnknownComplex(String),

    #[error("plotting error: {0}")]
    Plot(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GrapherError>;
