//! HTTP gateway to the run control management API.

use crate::core::domain::{
    error::{RebootError, RebootResult},
    model::{
        application::ApplicationRegistry, proxy_config::ProxyConfig,
        reboot_config::RateLimitConfig,
    },
    value_object::ApiUrl,
};
use crate::core::infrastructure::reachability::is_port_listening;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    Client, Method, Proxy, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A successful (status < 400) response, body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parses the body as JSON.
    pub fn json<T>(&self) -> RebootResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body)
            .map_err(|e| RebootError::Decode(format!("Failed to parse response: {}", e)))
    }
}

/// HTTP client for the management API.
///
/// The proxy decision is baked into the underlying client at construction
/// and applies to every request. Each call yields a classified result:
/// status errors, timeouts and connection faults are non-fatal, while a
/// transport failure with the tunnel absent becomes
/// [`RebootError::TunnelMissing`].
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    base_url: ApiUrl,
    proxy: ProxyConfig,
    tunnel: Option<(String, u16)>,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Errors
    /// Returns `RebootError::Configuration` if the proxy URL is rejected or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: ApiUrl,
        proxy: ProxyConfig,
        timeout: Duration,
        rate_limit: Option<RateLimitConfig>,
    ) -> RebootResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout);

        builder = match proxy.proxy_url() {
            Some(url) => builder.proxy(
                Proxy::all(&url)
                    .map_err(|e| RebootError::Configuration(format!("Invalid proxy {}: {}", url, e)))?,
            ),
            None => builder.no_proxy(),
        };

        let http_client = builder
            .build()
            .map_err(|e| RebootError::Configuration(e.to_string()))?;

        let rate_limiter = rate_limit.map(|rl| {
            let quota = Quota::per_second(rl.requests_per_second).allow_burst(rl.burst_size);
            Arc::new(DefaultDirectRateLimiter::direct(quota))
        });

        Ok(Self {
            http_client,
            base_url,
            proxy,
            tunnel: None,
            rate_limiter,
        })
    }

    /// Sets the tunnel endpoint checked when a request cannot connect.
    ///
    /// Without it only a SOCKS5 client checks, against its own proxy.
    pub fn with_tunnel_check(mut self, host: impl Into<String>, port: u16) -> Self {
        self.tunnel = Some((host.into(), port));
        self
    }

    fn tunnel(&self) -> Option<(&str, u16)> {
        self.tunnel
            .as_ref()
            .map(|(host, port)| (host.as_str(), *port))
            .or_else(|| self.proxy.tunnel())
    }

    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Performs a GET request against `path`, relative to the base URL.
    pub async fn get(&self, path: &str) -> RebootResult<ApiResponse> {
        self.execute_request(Method::GET, path, None::<&()>).await
    }

    /// Performs a POST whose body is the list of URIs of `registry`.
    ///
    /// Only the `URI` field of each record is sent, not the records themselves.
    pub async fn post_uris(
        &self,
        path: &str,
        registry: &ApplicationRegistry,
    ) -> RebootResult<ApiResponse> {
        let uris = registry.extract_uris();
        self.execute_request(Method::POST, path, Some(&uris)).await
    }

    /// Core request execution method. It applies rate limiting, sends the
    /// request and classifies the outcome.
    async fn execute_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> RebootResult<ApiResponse>
    where
        B: serde::Serialize,
    {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.base_url.endpoint(path);
        info!(%method, %url, proxy = %self.proxy, "Sending request");

        let mut req_builder = self.http_client.request(method, &url);
        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }

        let response = match req_builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.classify_send_error(&url, e).await),
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(%url, error = %e, "Failed to read response body");
            RebootError::Request(format!("Failed to read response body: {}", e))
        })?;

        if status.is_client_error() || status.is_server_error() {
            warn!(%url, status = status.as_u16(), body = %body, "HTTP error occurred");
            return Err(RebootError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%url, status = status.as_u16(), body = %body, "Response received");
        Ok(ApiResponse { status, body })
    }

    /// Maps a transport failure onto the error taxonomy.
    ///
    /// A connection failure, or any failure through the SOCKS proxy, checks
    /// the tunnel port first: nothing listening there means the operator is
    /// outside the control network, which ends the run.
    async fn classify_send_error(&self, url: &str, e: reqwest::Error) -> RebootError {
        if e.is_timeout() {
            warn!(%url, error = %e, "Timeout error occurred");
            return RebootError::Timeout(format!("{}: {}", url, e));
        }

        let check_tunnel = e.is_connect() || self.proxy.tunnel().is_some();
        if let Some((host, port)) = self.tunnel().filter(|_| check_tunnel) {
            if !is_port_listening(host, port).await {
                error!(host, port, "Missing tunnel to the control network");
                return RebootError::TunnelMissing {
                    host: host.to_string(),
                    port,
                };
            }
        }

        if e.is_connect() {
            warn!(%url, error = %e, "Connection error occurred");
            RebootError::Connection(format!("{}: {}", url, e))
        } else {
            warn!(%url, error = %e, "An error occurred during the request");
            RebootError::Request(format!("{}: {}", url, e))
        }
    }
}
