//! HTTP access to the route service

use crate::config::RouteServiceConfig;
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Header carrying the route service API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Raw JSON transport to the route service.
///
/// Paths include any query string and are appended to [`base_url`](Self::base_url).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteServiceClient: Send + Sync {
    fn base_url(&self) -> String;

    async fn get(&self, path: &str) -> SwapResult<Value>;

    async fn post(&self, path: &str, body: Value) -> SwapResult<Value>;
}

/// `reqwest` implementation of [`RouteServiceClient`]
pub struct HttpRouteServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRouteServiceClient {
    pub fn new(config: &RouteServiceConfig) -> SwapResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(api_key)
                .map_err(|e| SwapError::Config(format!("Invalid route service API key: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_response(
        &self,
        path: &str,
        started: Instant,
        response: reqwest::Response,
    ) -> SwapResult<Value> {
        let endpoint = endpoint_label(path);
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            crate::metrics::record_route_service_request(
                endpoint,
                false,
                started.elapsed().as_secs_f64(),
            );
            return Err(SwapError::RouteService {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let result = response.json::<Value>().await;
        crate::metrics::record_route_service_request(
            endpoint,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        Ok(result?)
    }
}

#[async_trait]
impl RouteServiceClient for HttpRouteServiceClient {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    async fn get(&self, path: &str) -> SwapResult<Value> {
        debug!("GET {}", path);
        let started = Instant::now();

        let response = match self.client.get(self.url(path)).send().await {
            Ok(response) => response,
            Err(e) => {
                crate::metrics::record_route_service_request(
                    endpoint_label(path),
                    false,
                    started.elapsed().as_secs_f64(),
                );
                return Err(e.into());
            }
        };

        self.read_response(path, started, response).await
    }

    async fn post(&self, path: &str, body: Value) -> SwapResult<Value> {
        debug!("POST {}", path);
        let started = Instant::now();

        let response = match self.client.post(self.url(path)).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                crate::metrics::record_route_service_request(
                    endpoint_label(path),
                    false,
                    started.elapsed().as_secs_f64(),
                );
                return Err(e.into());
            }
        };

        self.read_response(path, started, response).await
    }
}

/// Path without its query string, for metric labels
fn endpoint_label(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpRouteServiceClient::new(&RouteServiceConfig {
            base_url: "https://route.example.com/".to_string(),
            api_key: Some("secret".to_string()),
        })
        .unwrap();

        assert_eq!(client.base_url(), "https://route.example.com");
        assert_eq!(
            client.url("/v2/fungible/route"),
            "https://route.example.com/v2/fungible/route"
        );
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let result = HttpRouteServiceClient::new(&RouteServiceConfig {
            base_url: "https://route.example.com".to_string(),
            api_key: Some("bad\nkey".to_string()),
        });
        assert!(matches!(result, Err(SwapError::Config(_))));
    }

    #[test]
    fn test_endpoint_label_strips_query() {
        assert_eq!(
            endpoint_label("/v2/fungible/assets?chain_id=1&native_only=false"),
            "/v2/fungible/assets"
        );
        assert_eq!(endpoint_label("/v2/fungible/route"), "/v2/fungible/route");
    }
}
