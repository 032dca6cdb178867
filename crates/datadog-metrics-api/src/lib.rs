// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the subset of the Datadog API used to manage metric tag
//! configurations: top average usage metrics, active metric configurations,
//! metric metadata and tag configuration reads and writes.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod metrics_api;
pub mod models;
pub mod rate_limit;
pub mod site;

pub use client::{ClientConfig, DatadogClient};
pub use credentials::Credentials;
pub use error::ApiError;
pub use metrics_api::MetricsApi;
pub use reqwest::StatusCode;
