// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, NaiveDate, Utc};
use datadog_metrics_api::{ApiError, MetricsApi};
use tracing::{debug, warn};

/// A metric returned by the top average usage listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub metric_name: String,
    pub metric_rank: Option<i64>,
    pub avg_metric_hour: Option<i64>,
}

/// The day before `now`, in UTC.
pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    (now - chrono::Duration::days(1)).date_naive()
}

/// Fetches the top `limit` metrics by average hourly usage on `day`, in the
/// order returned by the API. Entries without a metric name are dropped.
pub async fn fetch_top_metrics(
    api: &dyn MetricsApi,
    day: NaiveDate,
    limit: u32,
) -> Result<Vec<UsageRecord>, ApiError> {
    let response = api.get_usage_top_avg_metrics(day, limit).await?;
    let records: Vec<UsageRecord> = response
        .usage
        .into_iter()
        .filter_map(|usage| match usage.metric_name {
            Some(metric_name) if !metric_name.is_empty() => Some(UsageRecord {
                metric_name,
                metric_rank: usage.metric_rank,
                avg_metric_hour: usage.avg_metric_hour,
            }),
            _ => {
                warn!("Ignoring usage entry without a metric name (rank {:?})", usage.metric_rank);
                None
            }
        })
        .collect();
    debug!("Fetched {} top average metrics for {day}", records.len());
    Ok(records)
}
