//! API call engine
//!
//! `ApiClient::call` builds the method URL, performs the exchange through the
//! transport, decodes the envelope and hands API errors to the dispatcher.
//! A recovery that needs the call again (re-authentication, rate limit)
//! loops back here with the same `StoredCall`, so replays never depend on
//! caller state.
//!
//! The closing flag is checked before the request goes out and again when
//! the response arrives; a closing connection gets `Error::Closing` and no
//! further requests.

use std::sync::Arc;

use common::Secret;
use serde_json::Value;
use tracing::{Instrument, debug, error, info_span};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::connection::Connection;
use crate::dispatch::ReplayBudget;
use crate::envelope::{self, ApiError, Envelope};
use crate::error::{Error, Result, TransportError};
use crate::metrics;
use crate::params::{CallParameters, StoredCall};
use crate::transport::{HttpRequest, HttpTransport};

/// Entry point for VK API calls on one connection.
///
/// Cheap to clone; clones share the connection and transport.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) connection: Arc<Connection>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) config: Arc<ApiConfig>,
}

impl ApiClient {
    pub fn new(
        connection: Arc<Connection>,
        transport: Arc<dyn HttpTransport>,
        config: ApiConfig,
    ) -> Self {
        Self {
            connection,
            transport,
            config: Arc::new(config),
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Call `method` with `params` and return its `"response"` value.
    ///
    /// Transient API errors are recovered internally; see `dispatch`.
    pub async fn call(&self, method: &str, params: &CallParameters) -> Result<Value> {
        let call = StoredCall::new(method, params.clone());
        let call_id = Uuid::new_v4();
        let span = info_span!("vk_call", method = %method, call_id = %call_id);

        let result = self.execute(&call).instrument(span).await;
        metrics::record_call(method, &result);
        result
    }

    async fn execute(&self, call: &StoredCall) -> Result<Value> {
        if self.connection.is_closing() {
            error!("API call attempted on a closing connection");
            return Err(Error::Closing);
        }

        let mut budget = ReplayBudget::new(self.config.max_reauth_attempts);
        loop {
            let (token, generation) = self.connection.token_snapshot();
            let request = HttpRequest::post(self.method_url(call, &token));
            let reply = self.transport.send(request).await;

            if self.connection.is_closing() {
                debug!("connection closed while the call was in flight, dropping response");
                return Err(Error::Closing);
            }

            let api_error = match self.classify_reply(reply, &token) {
                Ok(Envelope::Response(value)) => return Ok(value),
                Ok(Envelope::Error(raw)) => match ApiError::from_value(raw) {
                    Ok(api_error) => api_error,
                    Err(e) => {
                        error!(error = %token.redact_in(&e.to_string()), "unknown error response");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            };

            // Ok means the dispatcher wants the stored call replayed.
            self.dispatch(api_error, generation, &mut budget).await?;
        }
    }

    /// Turn the transport outcome into an envelope, logging failures.
    fn classify_reply(
        &self,
        reply: std::result::Result<crate::transport::HttpResponse, TransportError>,
        token: &Secret<String>,
    ) -> Result<Envelope> {
        let response = match reply {
            Ok(response) => response,
            Err(e) => {
                error!(error = %token.redact_in(&e.to_string()), "error while calling API");
                return Err(e.into());
            }
        };
        if !response.is_success() {
            let e = TransportError::Status {
                status: response.status,
                body: response.body,
            };
            error!(error = %token.redact_in(&e.to_string()), "error while calling API");
            return Err(e.into());
        }
        envelope::decode(&response.body).inspect_err(|e| {
            error!(error = %token.redact_in(&e.to_string()), "error parsing API response");
        })
    }

    /// `{base_url}/{method}?v={version}&access_token={token}[&{params}]`
    pub(crate) fn method_url(&self, call: &StoredCall, token: &Secret<String>) -> String {
        let mut url = format!(
            "{}/{}?v={}&access_token={}",
            self.config.base_url.trim_end_matches('/'),
            call.method(),
            self.config.version,
            token.expose()
        );
        let form = call.params().to_form();
        if !form.is_empty() {
            url.push('&');
            url.push_str(&form);
        }
        url
    }
}
