// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

pub const API_KEY_HEADER: &str = "DD-API-KEY";
pub const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";

/// API and application key pair sent with every request.
///
/// Both keys are required by the metrics and usage metering endpoints. The
/// `Debug` output never contains the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    application_key: String,
}

impl Credentials {
    /// Returns `None` when either key is empty. The key format is not checked.
    pub fn new(api_key: &str, application_key: &str) -> Option<Self> {
        if api_key.is_empty() || application_key.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            application_key: application_key.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials")
    }
}
