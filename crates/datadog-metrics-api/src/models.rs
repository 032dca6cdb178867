// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request and response documents for the endpoints used by the client.
//!
//! Only the fields that are read or written are modelled; unknown fields in
//! responses are ignored so that additions on the API side do not break
//! decoding.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Response of `GET /api/v1/usage/top_avg_metrics`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageTopAvgMetricsResponse {
    #[serde(default)]
    pub usage: Vec<UsageTopAvgMetricsHour>,
    #[serde(default)]
    pub metadata: Option<UsageTopAvgMetricsMetadata>,
}

/// One metric of the top average metrics listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageTopAvgMetricsHour {
    pub metric_name: Option<String>,
    pub avg_metric_hour: Option<i64>,
    pub max_metric_hour: Option<i64>,
    pub metric_category: Option<String>,
    pub metric_rank: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageTopAvgMetricsMetadata {
    pub day: Option<String>,
    pub month: Option<String>,
    pub pagination: Option<UsageTopAvgMetricsPagination>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageTopAvgMetricsPagination {
    pub limit: Option<i64>,
    pub next_record_id: Option<String>,
    pub total_number_of_records: Option<i64>,
}

/// Response of `GET /api/v2/metrics/{metric_name}/active-configurations`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveConfigurationResponse {
    pub data: Option<ActiveConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveConfiguration {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub attributes: Option<ActiveConfigurationAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActiveConfigurationAttributes {
    #[serde(default)]
    pub active_tags: Vec<String>,
}

impl ActiveConfiguration {
    /// Tags currently reported for the metric, in API order.
    pub fn active_tags(&self) -> &[String] {
        self.attributes
            .as_ref()
            .map(|attributes| attributes.active_tags.as_slice())
            .unwrap_or_default()
    }
}

/// Response of `GET /api/v1/metrics/{metric_name}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricMetadata {
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub description: Option<String>,
    pub short_name: Option<String>,
    pub unit: Option<String>,
    pub per_unit: Option<String>,
    pub integration: Option<String>,
    pub statsd_interval: Option<i64>,
}

/// Metric type of a tag configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Gauge,
    Count,
    Rate,
    #[default]
    Distribution,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Count => "count",
            Self::Rate => "rate",
            Self::Distribution => "distribution",
        }
    }
}

impl Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric type '{0}'")]
pub struct UnknownMetricType(pub String);

impl FromStr for MetricType {
    type Err = UnknownMetricType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gauge" => Ok(Self::Gauge),
            "count" => Ok(Self::Count),
            "rate" => Ok(Self::Rate),
            "distribution" => Ok(Self::Distribution),
            _ => Err(UnknownMetricType(s.to_string())),
        }
    }
}

/// Resource type of every tag configuration document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagConfigurationType {
    #[default]
    #[serde(rename = "manage_tags")]
    ManageTags,
}

/// Response of the tag configuration read, create and update endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TagConfigurationResponse {
    pub data: Option<TagConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TagConfiguration {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub attributes: Option<TagConfigurationAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TagConfigurationAttributes {
    #[serde(default)]
    pub tags: Vec<String>,
    pub metric_type: Option<String>,
    pub include_percentiles: Option<bool>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
}

impl TagConfigurationResponse {
    /// Tags of the configuration, or an empty slice if the API omitted them.
    pub fn tags(&self) -> &[String] {
        self.data
            .as_ref()
            .and_then(|data| data.attributes.as_ref())
            .map(|attributes| attributes.tags.as_slice())
            .unwrap_or_default()
    }
}

/// Body of `POST /api/v2/metrics/{metric_name}/tags`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationCreateRequest {
    pub data: TagConfigurationCreateData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationCreateData {
    #[serde(rename = "type")]
    pub kind: TagConfigurationType,
    pub id: String,
    pub attributes: TagConfigurationCreateAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationCreateAttributes {
    pub tags: Vec<String>,
    pub metric_type: MetricType,
}

impl TagConfigurationCreateRequest {
    pub fn new(metric_name: &str, tags: Vec<String>, metric_type: MetricType) -> Self {
        Self {
            data: TagConfigurationCreateData {
                kind: TagConfigurationType::ManageTags,
                id: metric_name.to_string(),
                attributes: TagConfigurationCreateAttributes { tags, metric_type },
            },
        }
    }
}

/// Body of `PATCH /api/v2/metrics/{metric_name}/tags`. The tag list replaces
/// the stored one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationUpdateRequest {
    pub data: TagConfigurationUpdateData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationUpdateData {
    #[serde(rename = "type")]
    pub kind: TagConfigurationType,
    pub id: String,
    pub attributes: TagConfigurationUpdateAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfigurationUpdateAttributes {
    pub tags: Vec<String>,
}

impl TagConfigurationUpdateRequest {
    pub fn new(metric_name: &str, tags: Vec<String>) -> Self {
        Self {
            data: TagConfigurationUpdateData {
                kind: TagConfigurationType::ManageTags,
                id: metric_name.to_string(),
                attributes: TagConfigurationUpdateAttributes { tags },
            },
        }
    }
}
