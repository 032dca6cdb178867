// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that prevent a reconciliation run from starting
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Datadog API and Application keys are not set in environment variables.")]
    MissingCredentials,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
