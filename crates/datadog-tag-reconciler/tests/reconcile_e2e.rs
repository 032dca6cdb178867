// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use datadog_metrics_api::models::MetricType;
use datadog_metrics_api::{DatadogClient, MetricsApi};
use datadog_tag_reconciler::config::{Config, API_KEY_ENV, APPLICATION_KEY_ENV};
use datadog_tag_reconciler::reconciler::{Action, MetricOutcome};
use datadog_tag_reconciler::run;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn config_for(server: &ServerGuard) -> Config {
    let vars = HashMap::from([
        (API_KEY_ENV.to_string(), "mock-api-key".to_string()),
        (APPLICATION_KEY_ENV.to_string(), "mock-app-key".to_string()),
        ("DD_API_URL".to_string(), server.url()),
        ("DD_TOP_METRICS_LIMIT".to_string(), "10".to_string()),
    ]);
    Config::from_lookup(|name| vars.get(name).cloned()).expect("failed to load config")
}

fn api_for(config: &Config) -> Arc<dyn MetricsApi> {
    Arc::new(DatadogClient::new(config.client_config()).expect("failed to create client"))
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date")
}

async fn mock_json(
    server: &mut ServerGuard,
    method: &str,
    path: &str,
    status: usize,
    body: serde_json::Value,
) -> Mock {
    server
        .mock(method, path)
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_header("X-RateLimit-Remaining", "50")
        .with_header("X-RateLimit-Reset", "30")
        .with_body(body.to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn reconciles_existing_and_missing_configurations() {
    let mut server = Server::new_async().await;
    let config = config_for(&server);

    let usage = server
        .mock("GET", "/api/v1/usage/top_avg_metrics")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("day".into(), "2026-10-15".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("X-RateLimit-Remaining", "50")
        .with_body(
            json!({
                "usage": [
                    {"metric_name": "requests.count", "metric_rank": 1},
                    {"metric_rank": 2},
                    {"metric_name": "latency.avg", "metric_rank": 3}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let requests_active = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/requests.count/active-configurations",
        200,
        json!({"data": {"id": "requests.count", "type": "actively_queried_configurations",
            "attributes": {"active_tags": ["service", "env"]}}}),
    )
    .await;
    let requests_metadata = mock_json(
        &mut server,
        "GET",
        "/api/v1/metrics/requests.count",
        200,
        json!({"type": "count", "unit": "request"}),
    )
    .await;
    let requests_existing = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/requests.count/tags",
        200,
        json!({"data": {"id": "requests.count", "type": "manage_tags",
            "attributes": {"tags": ["host"], "metric_type": "count"}}}),
    )
    .await;
    let requests_update = server
        .mock("PATCH", "/api/v2/metrics/requests.count/tags")
        .match_body(Matcher::Json(json!({
            "data": {
                "type": "manage_tags",
                "id": "requests.count",
                "attributes": {"tags": ["service", "env"]}
            }
        })))
        .with_status(200)
        .with_header("X-RateLimit-Remaining", "50")
        .with_body(
            json!({"data": {"id": "requests.count", "type": "manage_tags",
                "attributes": {"tags": ["service", "env"], "metric_type": "count"}}})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let latency_active = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/latency.avg/active-configurations",
        200,
        json!({"data": {"id": "latency.avg", "type": "actively_queried_configurations",
            "attributes": {"active_tags": ["env", "region", "service"]}}}),
    )
    .await;
    let latency_metadata = mock_json(
        &mut server,
        "GET",
        "/api/v1/metrics/latency.avg",
        200,
        json!({"unit": "millisecond"}),
    )
    .await;
    let latency_missing = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/latency.avg/tags",
        404,
        json!({"errors": ["Not found"]}),
    )
    .await;
    let latency_create = server
        .mock("POST", "/api/v2/metrics/latency.avg/tags")
        .match_body(Matcher::Json(json!({
            "data": {
                "type": "manage_tags",
                "id": "latency.avg",
                "attributes": {"tags": ["env", "region", "service"], "metric_type": "distribution"}
            }
        })))
        .with_status(201)
        .with_header("X-RateLimit-Remaining", "50")
        .with_body(
            json!({"data": {"id": "latency.avg", "type": "manage_tags", "attributes": {
                "tags": ["env", "region", "service"],
                "metric_type": "distribution"
            }}})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let no_other_writes = server
        .mock("PATCH", "/api/v2/metrics/latency.avg/tags")
        .expect(0)
        .create_async()
        .await;

    let summary = run(&config, api_for(&config), day())
        .await
        .expect("run failed");

    for mock in [
        usage,
        requests_active,
        requests_metadata,
        requests_existing,
        requests_update,
        latency_active,
        latency_metadata,
        latency_missing,
        latency_create,
        no_other_writes,
    ] {
        mock.assert_async().await;
    }

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.updated(), 1);
    assert_eq!(summary.created(), 1);
    match &summary.outcomes[1] {
        MetricOutcome::Created {
            metric,
            metric_type,
            tags,
        } => {
            assert_eq!(metric, "latency.avg");
            assert_eq!(*metric_type, MetricType::Distribution);
            assert_eq!(tags, &["env", "region", "service"]);
        }
        other => panic!("expected a created configuration, got {other:?}"),
    }
    assert_eq!(summary.outcomes[0].action(), Some(Action::Update));
}

#[tokio::test]
async fn failed_usage_listing_aborts_the_run() {
    let mut server = Server::new_async().await;
    let config = config_for(&server);

    let usage = server
        .mock("GET", "/api/v1/usage/top_avg_metrics")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"errors":["Forbidden"]}"#)
        .create_async()
        .await;
    let no_lookups = server
        .mock("GET", Matcher::Regex("^/api/v2/".to_string()))
        .expect(0)
        .create_async()
        .await;

    let err = run(&config, api_for(&config), day())
        .await
        .expect_err("expected the run to fail");

    usage.assert_async().await;
    no_lookups.assert_async().await;
    assert_eq!(err.status().map(|status| status.as_u16()), Some(403));
    assert_eq!(err.body(), Some(r#"{"errors":["Forbidden"]}"#));
}

#[tokio::test]
async fn failed_active_lookup_skips_only_that_metric() {
    let mut server = Server::new_async().await;
    let config = config_for(&server);

    let _usage = mock_json(
        &mut server,
        "GET",
        "/api/v1/usage/top_avg_metrics",
        200,
        json!({"usage": [{"metric_name": "broken.metric"}, {"metric_name": "queue.depth"}]}),
    )
    .await;
    let _broken = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/broken.metric/active-configurations",
        500,
        json!({"errors": ["Internal Server Error"]}),
    )
    .await;
    let broken_create = server
        .mock("POST", "/api/v2/metrics/broken.metric/tags")
        .expect(0)
        .create_async()
        .await;
    let broken_update = server
        .mock("PATCH", "/api/v2/metrics/broken.metric/tags")
        .expect(0)
        .create_async()
        .await;
    let _queue_active = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/queue.depth/active-configurations",
        200,
        json!({"data": {"id": "queue.depth", "attributes": {"active_tags": ["queue"]}}}),
    )
    .await;
    let _queue_metadata = mock_json(
        &mut server,
        "GET",
        "/api/v1/metrics/queue.depth",
        200,
        json!({"type": "gauge"}),
    )
    .await;
    let _queue_missing = mock_json(
        &mut server,
        "GET",
        "/api/v2/metrics/queue.depth/tags",
        404,
        json!({"errors": ["Not found"]}),
    )
    .await;
    let queue_create = server
        .mock("POST", "/api/v2/metrics/queue.depth/tags")
        .match_body(Matcher::PartialJson(json!({
            "data": {"attributes": {"tags": ["queue"], "metric_type": "gauge"}}
        })))
        .with_status(201)
        .with_body(
            json!({"data": {"id": "queue.depth", "attributes": {"tags": ["queue"]}}}).to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let summary = run(&config, api_for(&config), day())
        .await
        .expect("run failed");

    broken_create.assert_async().await;
    broken_update.assert_async().await;
    queue_create.assert_async().await;
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.created(), 1);
    assert_eq!(summary.outcomes[0].metric(), "broken.metric");
}
