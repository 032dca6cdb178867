// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-metric tag configuration reconciliation.
//!
//! For every metric the reconciler reads the tags that are actively in use,
//! infers the metric type and then either replaces the tags of the existing
//! tag configuration or creates one. A failure only affects the metric being
//! processed; the outcome is recorded and the next metric is handled.

use crate::usage::UsageRecord;
use datadog_metrics_api::endpoint::Endpoint;
use datadog_metrics_api::models::{
    MetricType, TagConfigurationCreateRequest, TagConfigurationUpdateRequest,
};
use datadog_metrics_api::{ApiError, MetricsApi};
use std::fmt::{self, Display};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Write issued for a metric's tag configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// Why a metric was left untouched.
#[derive(Debug)]
pub enum SkipReason {
    /// The active tag lookup failed.
    ActiveConfigurationLookup(ApiError),
    /// The active tag lookup succeeded but returned no configuration.
    NoActiveConfiguration,
}

/// Result of reconciling a single metric.
#[derive(Debug)]
pub enum MetricOutcome {
    Updated {
        metric: String,
        tags: Vec<String>,
    },
    Created {
        metric: String,
        metric_type: MetricType,
        tags: Vec<String>,
    },
    Skipped {
        metric: String,
        reason: SkipReason,
    },
    Failed {
        metric: String,
        action: Action,
        error: ApiError,
    },
}

impl MetricOutcome {
    pub fn metric(&self) -> &str {
        match self {
            Self::Updated { metric, .. }
            | Self::Created { metric, .. }
            | Self::Skipped { metric, .. }
            | Self::Failed { metric, .. } => metric,
        }
    }

    /// The write that was attempted, if the metric got that far.
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Updated { .. } => Some(Action::Update),
            Self::Created { .. } => Some(Action::Create),
            Self::Failed { action, .. } => Some(*action),
            Self::Skipped { .. } => None,
        }
    }
}

/// Outcomes of a run, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<MetricOutcome>,
}

impl RunSummary {
    fn count(&self, predicate: impl Fn(&MetricOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, MetricOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, MetricOutcome::Updated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, MetricOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, MetricOutcome::Failed { .. }))
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} metrics processed: {} created, {} updated, {} skipped, {} failed",
            self.outcomes.len(),
            self.created(),
            self.updated(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Logs a failed call along with whatever the API answered.
pub(crate) fn log_api_error(endpoint: Endpoint, err: &ApiError) {
    error!("Error when calling `{endpoint}`: {err}");
    match (err.status(), err.body()) {
        (Some(status), Some(body)) => error!("Full HTTP response: {status} {body}"),
        (Some(status), None) => error!("Full HTTP response: {status}"),
        (None, _) => error!("Full HTTP response: none"),
    }
}

/// Maps the metadata type to a tag configuration type.
fn resolve_metric_type(metadata_type: Option<&str>) -> MetricType {
    let Some(metadata_type) = metadata_type else {
        return MetricType::default();
    };
    match metadata_type.parse::<MetricType>() {
        Ok(metric_type) => {
            info!("Metric Type: {metric_type}");
            metric_type
        }
        Err(err) => {
            warn!("{err}, using {}", MetricType::default());
            MetricType::default()
        }
    }
}

pub struct Reconciler {
    api: Arc<dyn MetricsApi>,
    window_seconds: u64,
}

impl Reconciler {
    pub fn new(api: Arc<dyn MetricsApi>, window_seconds: u64) -> Self {
        Self {
            api,
            window_seconds,
        }
    }

    /// Reconciles every record in order, one at a time.
    pub async fn reconcile_all(&self, records: &[UsageRecord]) -> RunSummary {
        let mut summary = RunSummary {
            outcomes: Vec::with_capacity(records.len()),
        };
        for record in records {
            let outcome = self.reconcile_metric(&record.metric_name).await;
            summary.outcomes.push(outcome);
        }
        summary
    }

    pub async fn reconcile_metric(&self, metric_name: &str) -> MetricOutcome {
        let active = match self
            .api
            .list_active_metric_configurations(metric_name, self.window_seconds)
            .await
        {
            Ok(response) => response.data,
            Err(err) => {
                log_api_error(Endpoint::ActiveMetricConfigurations, &err);
                return MetricOutcome::Skipped {
                    metric: metric_name.to_string(),
                    reason: SkipReason::ActiveConfigurationLookup(err),
                };
            }
        };
        let Some(active) = active else {
            warn!("No active configuration returned for {metric_name}, skipping");
            return MetricOutcome::Skipped {
                metric: metric_name.to_string(),
                reason: SkipReason::NoActiveConfiguration,
            };
        };

        info!("-----------------------");
        info!("Metric ID: {}", active.id.as_deref().unwrap_or(metric_name));

        // Metadata is best effort, the default type is used when it fails.
        let metric_type = match self.api.get_metric_metadata(metric_name).await {
            Ok(metadata) => resolve_metric_type(metadata.metric_type.as_deref()),
            Err(err) => {
                log_api_error(Endpoint::MetricMetadata, &err);
                MetricType::default()
            }
        };

        let existing = match self.api.list_tag_configuration_by_name(metric_name).await {
            Ok(response) => response.data,
            Err(err) => {
                info!("List Tag configuration not found. Creating new one.");
                log_api_error(Endpoint::ListTagConfiguration, &err);
                None
            }
        };

        let active_tags = active.active_tags().to_vec();
        info!("Metric Active Tags: {active_tags:?}");

        if existing.is_some() {
            self.update(metric_name, active_tags).await
        } else {
            self.create(metric_name, active_tags, metric_type).await
        }
    }

    async fn update(&self, metric_name: &str, tags: Vec<String>) -> MetricOutcome {
        let body = TagConfigurationUpdateRequest::new(metric_name, tags);
        match self.api.update_tag_configuration(metric_name, &body).await {
            Ok(response) => {
                let tags = response.tags().to_vec();
                info!("Metric Tags: {tags:?}");
                MetricOutcome::Updated {
                    metric: metric_name.to_string(),
                    tags,
                }
            }
            Err(err) => {
                log_api_error(Endpoint::UpdateTagConfiguration, &err);
                MetricOutcome::Failed {
                    metric: metric_name.to_string(),
                    action: Action::Update,
                    error: err,
                }
            }
        }
    }

    async fn create(
        &self,
        metric_name: &str,
        tags: Vec<String>,
        metric_type: MetricType,
    ) -> MetricOutcome {
        let body = TagConfigurationCreateRequest::new(metric_name, tags, metric_type);
        match self.api.create_tag_configuration(metric_name, &body).await {
            Ok(response) => {
                let tags = response.tags().to_vec();
                info!("Metric Tags: {tags:?}");
                MetricOutcome::Created {
                    metric: metric_name.to_string(),
                    metric_type,
                    tags,
                }
            }
            Err(err) => {
                log_api_error(Endpoint::CreateTagConfiguration, &err);
                MetricOutcome::Failed {
                    metric: metric_name.to_string(),
                    action: Action::Create,
                    error: err,
                }
            }
        }
    }
}
