// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the Datadog API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level issue (DNS, TLS, socket, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API answered with a non-success status. The raw body is kept so it
    /// can be reported alongside the error.
    #[error("{status} returned by API")]
    Status { status: StatusCode, body: String },
    /// Response body could not be decoded as the expected JSON document.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Status code of the response that produced this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Raw body of the error response, if the API answered at all.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
