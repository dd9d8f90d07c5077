//! HTTP facade
//!
//! The engine only needs "send this request, give me status and body".
//! `HttpTransport` is that seam; `ReqwestTransport` is the production
//! implementation. It owns its keep-alive pool and optional cookie jar, so
//! their lifetime is the lifetime of the session that created it.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn HttpTransport>`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::cookie::Jar;
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::TransportError;

/// One outgoing HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
        }
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange.
///
/// Resolves exactly once: `Ok` with any HTTP response (including non-2xx),
/// `Err` when no response was obtained (DNS, TLS, timeout, reset).
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>>;
}

/// `reqwest`-backed transport with an owned connection pool.
pub struct ReqwestTransport {
    client: reqwest::Client,
    cookies: Option<Arc<Jar>>,
}

impl ReqwestTransport {
    /// Build a transport; a fresh cookie jar is created when `config.cookies` is set.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let jar = config.cookies.then(|| Arc::new(Jar::default()));
        Self::build(config, jar)
    }

    /// Build a transport that shares `jar` with other transports of the same session.
    pub fn with_cookie_jar(config: &TransportConfig, jar: Arc<Jar>) -> Result<Self, TransportError> {
        Self::build(config, Some(jar))
    }

    fn build(config: &TransportConfig, cookies: Option<Arc<Jar>>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone());
        if let Some(jar) = &cookies {
            builder = builder.cookie_provider(Arc::clone(jar));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        debug!(
            pool_max_idle_per_host = config.pool_max_idle_per_host,
            cookies = cookies.is_some(),
            "HTTP transport ready"
        );
        Ok(Self { client, cookies })
    }

    /// Cookie jar shared by this transport's requests, if enabled.
    pub fn cookie_jar(&self) -> Option<&Arc<Jar>> {
        self.cookies.as_ref()
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .client
                .request(request.method, &request.url)
                .send()
                .await
                .map_err(|e| TransportError::Request(e.without_url().to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Request(format!("reading body: {}", e.without_url())))?;
            Ok(HttpResponse { status, body })
        })
    }
}
