// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ApiError;
use crate::models::{
    ActiveConfigurationResponse, MetricMetadata, TagConfigurationCreateRequest,
    TagConfigurationResponse, TagConfigurationUpdateRequest, UsageTopAvgMetricsResponse,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// The Datadog operations needed to reconcile metric tag configurations.
///
/// [`crate::client::DatadogClient`] implements this over HTTP; tests swap in
/// their own implementation.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Top `limit` metrics by average hourly usage on `day`.
    async fn get_usage_top_avg_metrics(
        &self,
        day: NaiveDate,
        limit: u32,
    ) -> Result<UsageTopAvgMetricsResponse, ApiError>;

    /// Tags and aggregations actively queried for `metric_name` over the
    /// trailing `window_seconds`.
    async fn list_active_metric_configurations(
        &self,
        metric_name: &str,
        window_seconds: u64,
    ) -> Result<ActiveConfigurationResponse, ApiError>;

    async fn get_metric_metadata(&self, metric_name: &str) -> Result<MetricMetadata, ApiError>;

    /// Existing tag configuration. Answers 404 when none has been created.
    async fn list_tag_configuration_by_name(
        &self,
        metric_name: &str,
    ) -> Result<TagConfigurationResponse, ApiError>;

    async fn create_tag_configuration(
        &self,
        metric_name: &str,
        body: &TagConfigurationCreateRequest,
    ) -> Result<TagConfigurationResponse, ApiError>;

    async fn update_tag_configuration(
        &self,
        metric_name: &str,
        body: &TagConfigurationUpdateRequest,
    ) -> Result<TagConfigurationResponse, ApiError>;
}
