// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ConfigError;
use datadog_metrics_api::client::{ClientConfig, DEFAULT_TIMEOUT};
use datadog_metrics_api::rate_limit::{HeaderFallback, RateLimitPolicy};
use datadog_metrics_api::site::{ApiUrl, Site, DEFAULT_SITE};
use datadog_metrics_api::Credentials;
use std::env;
use std::time::Duration;

pub const API_KEY_ENV: &str = "DATADOG_API_KEY";
pub const APPLICATION_KEY_ENV: &str = "DATADOG_APPLICATION_KEY";

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TOP_METRICS_LIMIT: u32 = 100;
/// Trailing window used to collect active tags, roughly one month.
pub const ACTIVE_CONFIGURATION_WINDOW_SECONDS: u64 = 2_628_000;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn is_valid_log_level(level: &str) -> bool {
    VALID_LOG_LEVELS.contains(&level)
}

/// Settings for a reconciliation run
#[derive(Debug, Clone)]
pub struct Config {
    /// API and application keys sent with every request
    pub credentials: Credentials,
    /// Datadog site (e.g., datadoghq.com, datadoghq.eu)
    pub site: Site,
    /// Base URL of the API, derived from the site unless overridden
    pub api_url: ApiUrl,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Number of top average usage metrics to reconcile
    pub top_metrics_limit: u32,
    /// Window of the active tag lookup, in seconds
    pub active_window_seconds: u64,
    pub timeout: Duration,
    pub rate_limit_policy: RateLimitPolicy,
    pub header_fallback: HeaderFallback,
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// Credentials are checked first: a missing or empty key is reported as
    /// [`ConfigError::MissingCredentials`] whatever else is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV).unwrap_or_default();
        let application_key = lookup(APPLICATION_KEY_ENV).unwrap_or_default();
        let credentials =
            Credentials::new(&api_key, &application_key).ok_or(ConfigError::MissingCredentials)?;

        let site = Site::new(lookup("DD_SITE").unwrap_or_else(|| DEFAULT_SITE.to_string()))
            .map_err(|e| ConfigError::InvalidConfig(format!("DD_SITE: {e}")))?;
        let api_url = match lookup("DD_API_URL") {
            Some(url) => ApiUrl::new(url),
            None => ApiUrl::from_site(&site),
        }
        .map_err(|e| ConfigError::InvalidConfig(format!("API URL: {e}")))?;

        let https_proxy = lookup("DD_PROXY_HTTPS").or_else(|| lookup("HTTPS_PROXY"));
        let log_level = lookup("DD_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let top_metrics_limit = lookup("DD_TOP_METRICS_LIMIT")
            .and_then(|limit| limit.parse::<u32>().ok())
            .unwrap_or(DEFAULT_TOP_METRICS_LIMIT);
        let rate_limit_policy = match lookup("DD_RATE_LIMIT_POLICY") {
            Some(policy) => policy
                .parse::<RateLimitPolicy>()
                .map_err(|e| ConfigError::InvalidConfig(format!("DD_RATE_LIMIT_POLICY: {e}")))?,
            None => RateLimitPolicy::default(),
        };
        let header_fallback = match lookup("DD_RATE_LIMIT_HEADER_FALLBACK") {
            Some(fallback) => fallback.parse::<HeaderFallback>().map_err(|e| {
                ConfigError::InvalidConfig(format!("DD_RATE_LIMIT_HEADER_FALLBACK: {e}"))
            })?,
            None => HeaderFallback::default(),
        };

        let config = Self {
            credentials,
            site,
            api_url,
            https_proxy,
            log_level,
            top_metrics_limit,
            active_window_seconds: ACTIVE_CONFIGURATION_WINDOW_SECONDS,
            timeout: DEFAULT_TIMEOUT,
            rate_limit_policy,
            header_fallback,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_metrics_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "DD_TOP_METRICS_LIMIT must be greater than 0".to_string(),
            ));
        }

        if !is_valid_log_level(&self.log_level) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            credentials: self.credentials.clone(),
            api_url: self.api_url.clone(),
            https_proxy: self.https_proxy.clone(),
            timeout: self.timeout,
            rate_limit_policy: self.rate_limit_policy,
            header_fallback: self.header_fallback,
        }
    }
}
