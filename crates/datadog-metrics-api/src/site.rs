// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ApiError;
use reqwest::Url;
use std::fmt::{self, Display};

pub const DEFAULT_SITE: &str = "datadoghq.com";

/// A Datadog site such as `datadoghq.com` or `datadoghq.eu`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site(String);

impl Site {
    pub fn new(site: String) -> Result<Self, ApiError> {
        let trimmed = site.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidUrl("site cannot be empty".to_string()));
        }
        if trimmed.contains("://") || trimmed.contains('/') {
            return Err(ApiError::InvalidUrl(format!(
                "site must be a bare domain, got '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl Default for Site {
    fn default() -> Self {
        Self(DEFAULT_SITE.to_string())
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base URL every API path is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Full override of the base URL, e.g. a local mock server.
    pub fn new(url: String) -> Result<Self, ApiError> {
        let parsed = Url::parse(&url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(url));
        }
        Ok(Self(parsed))
    }

    pub fn from_site(site: &Site) -> Result<Self, ApiError> {
        Self::new(format!("https://api.{site}"))
    }

    /// Joins `segments` onto the base path. Each segment is percent-encoded,
    /// so metric names are never interpreted as path separators.
    pub fn join(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.0.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.0.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
