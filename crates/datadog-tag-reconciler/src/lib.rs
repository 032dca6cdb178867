// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sets the tag configuration of the most used metrics of an organization to
//! the tags that are actually queried for them.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod logging;
pub mod reconciler;
pub mod usage;

use chrono::NaiveDate;
use datadog_metrics_api::endpoint::Endpoint;
use datadog_metrics_api::{ApiError, MetricsApi};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::reconciler::{log_api_error, Reconciler, RunSummary};

/// Reconciles the top metrics of `day`.
///
/// Only a failure to list the top metrics aborts the run. Every other error
/// is confined to the metric it happened on and shows up in the summary.
pub async fn run(
    config: &Config,
    api: Arc<dyn MetricsApi>,
    day: NaiveDate,
) -> Result<RunSummary, ApiError> {
    let records = usage::fetch_top_metrics(api.as_ref(), day, config.top_metrics_limit)
        .await
        .inspect_err(|err| log_api_error(Endpoint::UsageTopAvgMetrics, err))?;
    info!("Reconciling {} metrics for {day}", records.len());

    let reconciler = Reconciler::new(api, config.active_window_seconds);
    let summary = reconciler.reconcile_all(&records).await;
    info!("{summary}");
    Ok(summary)
}
