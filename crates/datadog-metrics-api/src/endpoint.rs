// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display};

/// API operations issued by the client. Also used as the key for
/// per-endpoint rate limit tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /api/v1/usage/top_avg_metrics`
    UsageTopAvgMetrics,
    /// `GET /api/v2/metrics/{metric_name}/active-configurations`
    ActiveMetricConfigurations,
    /// `GET /api/v1/metrics/{metric_name}`
    MetricMetadata,
    /// `GET /api/v2/metrics/{metric_name}/tags`
    ListTagConfiguration,
    /// `POST /api/v2/metrics/{metric_name}/tags`
    CreateTagConfiguration,
    /// `PATCH /api/v2/metrics/{metric_name}/tags`
    UpdateTagConfiguration,
}

impl Endpoint {
    /// Name of the operation as it appears in diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::UsageTopAvgMetrics => "UsageMeteringApi.GetUsageTopAvgMetrics",
            Self::ActiveMetricConfigurations => "MetricsApi.ListActiveMetricConfigurations",
            Self::MetricMetadata => "MetricsApi.GetMetricMetadata",
            Self::ListTagConfiguration => "MetricsApi.ListTagConfigurationByName",
            Self::CreateTagConfiguration => "MetricsApi.CreateTagConfiguration",
            Self::UpdateTagConfiguration => "MetricsApi.UpdateTagConfiguration",
        }
    }

    /// Path segments below the base URL.
    pub(crate) fn segments<'a>(&self, metric_name: &'a str) -> Vec<&'a str> {
        match self {
            Self::UsageTopAvgMetrics => vec!["api", "v1", "usage", "top_avg_metrics"],
            Self::ActiveMetricConfigurations => {
                vec!["api", "v2", "metrics", metric_name, "active-configurations"]
            }
            Self::MetricMetadata => vec!["api", "v1", "metrics", metric_name],
            Self::ListTagConfiguration
            | Self::CreateTagConfiguration
            | Self::UpdateTagConfiguration => vec!["api", "v2", "metrics", metric_name, "tags"],
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}
