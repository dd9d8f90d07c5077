//! API error dispatcher
//!
//! `classify` maps an error code to a recovery action (pure, no I/O).
//! `ApiClient::dispatch` carries the action out:
//!
//! | code | action |
//! |---|---|
//! | 5 authorization failed | re-authenticate (or wait for the host's login), then replay |
//! | 6 too many requests | replay after the rate-limit delay |
//! | 9 flood control | drop silently |
//! | 17 validation required | notify the host, then fail with the error |
//! | 10 internal server error | report a fatal session error, close the connection, then fail with the error |
//! | 14 captcha needed | fail with the error, no error log |
//! | anything else | log and fail with the error |

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::envelope::{ApiError, ErrorCode};
use crate::error::{Error, Result};
use crate::metrics;

/// What to do about an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Reauthenticate,
    RetryAfter(Duration),
    Drop,
    NotifyValidation,
    Fatal,
    Propagate { log: bool },
}

impl Recovery {
    /// Label for the `action` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            Recovery::Reauthenticate => "reauth",
            Recovery::RetryAfter(_) => "rate_limit",
            Recovery::Drop => "flood_drop",
            Recovery::NotifyValidation => "validation",
            Recovery::Fatal => "fatal",
            Recovery::Propagate { .. } => "propagate",
        }
    }
}

/// Select the recovery for an API error.
pub fn classify(error: &ApiError, config: &ApiConfig) -> Recovery {
    match error.code {
        ErrorCode::AuthorizationFailed => Recovery::Reauthenticate,
        ErrorCode::TooManyRequests => Recovery::RetryAfter(config.rate_limit_retry()),
        ErrorCode::FloodControl => Recovery::Drop,
        ErrorCode::ValidationRequired => Recovery::NotifyValidation,
        ErrorCode::InternalServerError => Recovery::Fatal,
        // Captcha is expected and handled by a higher layer.
        ErrorCode::CaptchaNeeded => Recovery::Propagate { log: false },
        ErrorCode::Other(_) => Recovery::Propagate { log: true },
    }
}

/// Re-authentication cycles left for one logical call.
#[derive(Debug)]
pub(crate) struct ReplayBudget {
    reauth_left: u32,
}

impl ReplayBudget {
    pub(crate) fn new(max_reauth_attempts: u32) -> Self {
        Self {
            reauth_left: max_reauth_attempts,
        }
    }

    fn take_reauth(&mut self) -> bool {
        if self.reauth_left == 0 {
            return false;
        }
        self.reauth_left -= 1;
        true
    }
}

impl ApiClient {
    /// Handle an API error for a call whose token had `generation`.
    ///
    /// `Ok(())` asks the engine to replay the stored call; `Err` is the
    /// call's final outcome.
    pub(crate) async fn dispatch(
        &self,
        api_error: ApiError,
        generation: u64,
        budget: &mut ReplayBudget,
    ) -> Result<()> {
        let recovery = classify(&api_error, &self.config);
        metrics::record_recovery(recovery.label());

        match recovery {
            Recovery::Reauthenticate => {
                self.recover_authorization(api_error, generation, budget)
                    .await
            }
            Recovery::RetryAfter(delay) => {
                info!(
                    retry_in_ms = delay.as_millis() as u64,
                    "call rate limit hit, retrying"
                );
                self.sleep_unless_closed(delay).await
            }
            Recovery::Drop => {
                debug!("flood control, dropping the call");
                Err(Error::FloodControl)
            }
            Recovery::NotifyValidation => {
                warn!(
                    redirect_uri = api_error.redirect_uri.as_deref().unwrap_or(""),
                    "validation required"
                );
                self.connection
                    .events()
                    .validation_required(api_error.redirect_uri.as_deref());
                Err(Error::Api(api_error))
            }
            Recovery::Fatal => {
                let serialized = self.redacted(&api_error);
                self.connection
                    .events()
                    .fatal_error(&format!("VK internal server error: {serialized}"));
                error!(error_code = api_error.code.code(), error = %serialized, "VK call error");
                self.connection.close();
                Err(Error::Api(api_error))
            }
            Recovery::Propagate { log } => {
                if log {
                    error!(
                        error_code = api_error.code.code(),
                        error = %self.redacted(&api_error),
                        "VK call error"
                    );
                }
                Err(Error::Api(api_error))
            }
        }
    }

    /// Get a usable token after "authorization failed".
    ///
    /// An empty token with no re-authentication of ours running means the
    /// host is still logging in: poll until it installs a token. Otherwise
    /// re-authenticate past `generation` (joining an in-flight attempt).
    /// Only re-authentication draws on `budget`; waiting for the host does not.
    async fn recover_authorization(
        &self,
        api_error: ApiError,
        generation: u64,
        budget: &mut ReplayBudget,
    ) -> Result<()> {
        let connection = &self.connection;
        if connection.access_token().is_empty() && !connection.auth_in_flight() {
            info!("no access token yet, waiting for authentication");
            return self.wait_for_token().await;
        }

        if !budget.take_reauth() {
            warn!(
                attempts = self.config.max_reauth_attempts,
                "authorization still failing after re-authentication, giving up"
            );
            return Err(Error::Api(api_error));
        }
        connection.reauthenticate(generation).await?;
        if connection.is_closing() {
            return Err(Error::Closing);
        }
        Ok(())
    }

    async fn wait_for_token(&self) -> Result<()> {
        let interval = self.config.auth_poll_interval();
        loop {
            self.sleep_unless_closed(interval).await?;
            if !self.connection.access_token().is_empty() {
                debug!("access token available, replaying call");
                return Ok(());
            }
        }
    }

    /// Wait on a registered timer; fails silently if the connection closes meanwhile.
    async fn sleep_unless_closed(&self, delay: Duration) -> Result<()> {
        let timer = self.connection.timers().schedule(delay);
        let timer_id = timer.id();
        if !timer.wait().await {
            debug!(?timer_id, "timer cancelled, dropping the call");
            return Err(Error::Cancelled);
        }
        if self.connection.is_closing() {
            return Err(Error::Closing);
        }
        Ok(())
    }

    fn redacted(&self, api_error: &ApiError) -> String {
        self.connection
            .access_token()
            .redact_in(&api_error.raw().to_string())
    }
}
