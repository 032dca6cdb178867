// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::credentials::{Credentials, API_KEY_HEADER, APPLICATION_KEY_HEADER};
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::metrics_api::MetricsApi;
use crate::models::{
    ActiveConfigurationResponse, MetricMetadata, TagConfigurationCreateRequest,
    TagConfigurationResponse, TagConfigurationUpdateRequest, UsageTopAvgMetricsResponse,
};
use crate::rate_limit::{HeaderFallback, RateLimitGuard, RateLimitPolicy};
use crate::site::ApiUrl;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to build a [`DatadogClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub api_url: ApiUrl,
    pub https_proxy: Option<String>,
    pub timeout: Duration,
    pub rate_limit_policy: RateLimitPolicy,
    pub header_fallback: HeaderFallback,
}

/// HTTP implementation of [`MetricsApi`].
///
/// One client is meant to be shared by every call of a run: the underlying
/// `reqwest::Client` reuses connections and the rate limit guard sees every
/// response.
#[derive(Debug)]
pub struct DatadogClient {
    client: Client,
    api_url: ApiUrl,
    headers: HeaderMap,
    rate_limit: RateLimitGuard,
}

impl DatadogClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!(
                "datadog-tag-reconciler/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .map_err(|_| ApiError::InvalidHeader("User-Agent"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut api_key = HeaderValue::from_str(config.credentials.api_key())
            .map_err(|_| ApiError::InvalidHeader(API_KEY_HEADER))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);
        let mut app_key = HeaderValue::from_str(config.credentials.application_key())
            .map_err(|_| ApiError::InvalidHeader(APPLICATION_KEY_HEADER))?;
        app_key.set_sensitive(true);
        headers.insert(APPLICATION_KEY_HEADER, app_key);

        let client = build_client(config.https_proxy.as_deref(), config.timeout)?;

        Ok(Self {
            client,
            api_url: config.api_url,
            headers,
            rate_limit: RateLimitGuard::new(config.rate_limit_policy, config.header_fallback),
        })
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    fn url(&self, endpoint: Endpoint, metric_name: &str) -> Result<Url, ApiError> {
        self.api_url.join(&endpoint.segments(metric_name))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).headers(self.headers.clone())
    }

    /// Sends the request and decodes a JSON response.
    ///
    /// The rate limit guard sees the response before its status is checked,
    /// so an exhausted quota is honoured even when the call itself failed.
    async fn execute<T: DeserializeOwned + Send>(
        &self,
        endpoint: Endpoint,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        self.rate_limit.before_request(endpoint).await;

        debug!(endpoint = %endpoint, "sending request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                self.rate_limit.after_response(endpoint, None).await;
                return Err(ApiError::Transport(err));
            }
        };
        self.rate_limit
            .after_response(endpoint, Some(response.headers()))
            .await;

        let status = response.status();
        debug!(endpoint = %endpoint, status = %status, "received response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        endpoint: Endpoint,
        method: Method,
        metric_name: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint, metric_name)?;
        let builder = self.request(method, url).json(body);
        self.execute(endpoint, builder).await
    }
}

fn build_client(proxy_url: Option<&str>, timeout: Duration) -> Result<Client, ApiError> {
    let mut builder = Client::builder().use_rustls_tls().timeout(timeout);
    if let Some(proxy) = proxy_url {
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| ApiError::ClientBuild(format!("invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| ApiError::ClientBuild(e.to_string()))
}

#[async_trait]
impl MetricsApi for DatadogClient {
    async fn get_usage_top_avg_metrics(
        &self,
        day: NaiveDate,
        limit: u32,
    ) -> Result<UsageTopAvgMetricsResponse, ApiError> {
        let endpoint = Endpoint::UsageTopAvgMetrics;
        let mut url = self.url(endpoint, "")?;
        url.query_pairs_mut()
            .append_pair("day", &day.format("%Y-%m-%d").to_string())
            .append_pair("limit", &limit.to_string());
        self.execute(endpoint, self.request(Method::GET, url)).await
    }

    async fn list_active_metric_configurations(
        &self,
        metric_name: &str,
        window_seconds: u64,
    ) -> Result<ActiveConfigurationResponse, ApiError> {
        let endpoint = Endpoint::ActiveMetricConfigurations;
        let mut url = self.url(endpoint, metric_name)?;
        url.query_pairs_mut()
            .append_pair("window[seconds]", &window_seconds.to_string());
        self.execute(endpoint, self.request(Method::GET, url)).await
    }

    async fn get_metric_metadata(&self, metric_name: &str) -> Result<MetricMetadata, ApiError> {
        let endpoint = Endpoint::MetricMetadata;
        let url = self.url(endpoint, metric_name)?;
        self.execute(endpoint, self.request(Method::GET, url)).await
    }

    async fn list_tag_configuration_by_name(
        &self,
        metric_name: &str,
    ) -> Result<TagConfigurationResponse, ApiError> {
        let endpoint = Endpoint::ListTagConfiguration;
        let url = self.url(endpoint, metric_name)?;
        self.execute(endpoint, self.request(Method::GET, url)).await
    }

    async fn create_tag_configuration(
        &self,
        metric_name: &str,
        body: &TagConfigurationCreateRequest,
    ) -> Result<TagConfigurationResponse, ApiError> {
        self.send_json(
            Endpoint::CreateTagConfiguration,
            Method::POST,
            metric_name,
            body,
        )
        .await
    }

    async fn update_tag_configuration(
        &self,
        metric_name: &str,
        body: &TagConfigurationUpdateRequest,
    ) -> Result<TagConfigurationResponse, ApiError> {
        self.send_json(
            Endpoint::UpdateTagConfiguration,
            Method::PATCH,
            metric_name,
            body,
        )
        .await
    }
}
