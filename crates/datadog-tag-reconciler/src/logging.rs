// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::{is_valid_log_level, DEFAULT_LOG_LEVEL};
use tracing_subscriber::EnvFilter;

/// Builds the console filter for `log_level`.
///
/// Anything other than a plain level falls back to the default, as an
/// arbitrary string would parse as a target directive and mute every other
/// target.
pub fn env_filter(log_level: &str) -> EnvFilter {
    let level = if is_valid_log_level(log_level) {
        log_level
    } else {
        DEFAULT_LOG_LEVEL
    };
    EnvFilter::new(format!("h2=off,hyper=off,rustls=off,{level}"))
}
