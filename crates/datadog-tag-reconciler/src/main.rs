// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use chrono::Utc;
use std::{env, sync::Arc};
use tracing::{debug, error};

use datadog_metrics_api::DatadogClient;
use datadog_tag_reconciler::{
    config::{Config, DEFAULT_LOG_LEVEL},
    error::ConfigError,
    logging::env_filter,
    run,
    usage::yesterday,
};

#[tokio::main(flavor = "current_thread")]
pub async fn main() {
    let log_level = env::var("DD_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or(DEFAULT_LOG_LEVEL.to_string());

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter(&log_level))
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return;
    }

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e @ ConfigError::MissingCredentials) => {
            error!("{e}");
            return;
        }
        Err(e) => {
            error!("Error loading configuration: {e}");
            return;
        }
    };

    let client = match DatadogClient::new(config.client_config()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Could not create Datadog API client: {e}");
            return;
        }
    };

    let day = yesterday(Utc::now());
    debug!("Reconciling tag configurations against usage of {day}");

    // Failures are logged inside the run; the process always exits normally.
    if run(&config, client, day).await.is_err() {
        debug!("Run aborted before any metric was processed");
    }
}
