//! Per-session connection context
//!
//! Holds everything calls share: the access token, the closing flag, the
//! timer registry and the re-authentication gate. The host owns the
//! `Connection` (as `Arc<Connection>`) and supplies two collaborators:
//! - `Authenticator` obtains a fresh access token
//! - `SessionEvents` receives user-facing notices and fatal errors
//!
//! Re-authentication is serialized by an explicit gate instead of being
//! inferred from an empty token. Each token carries a generation number; a
//! call that saw generation `g` rejected asks for re-authentication "past
//! `g`", and only the first such request actually authenticates.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::Secret;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::timer::TimerRegistry;

/// External authentication collaborator.
pub trait Authenticator: Send + Sync {
    /// Obtain a new access token.
    fn authenticate(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>, AuthError>> + Send + '_>>;
}

/// Host hooks for outcomes the API layer cannot handle itself.
pub trait SessionEvents: Send + Sync {
    /// The server demands out-of-band identity validation. `redirect_uri` is
    /// the verification link, `None` when the server gave none.
    fn validation_required(&self, redirect_uri: Option<&str>);

    /// The session cannot continue and should be terminated.
    fn fatal_error(&self, message: &str);
}

struct TokenState {
    token: Secret<String>,
    generation: u64,
}

/// Shared state of one logged-in session.
pub struct Connection {
    token: RwLock<TokenState>,
    closing: AtomicBool,
    timers: TimerRegistry,
    auth_gate: tokio::sync::Mutex<()>,
    auth_in_flight: AtomicBool,
    authenticator: Arc<dyn Authenticator>,
    events: Arc<dyn SessionEvents>,
}

impl Connection {
    /// A connection without a token; the host is expected to authenticate.
    pub fn new(authenticator: Arc<dyn Authenticator>, events: Arc<dyn SessionEvents>) -> Self {
        Self {
            token: RwLock::new(TokenState {
                token: Secret::default(),
                generation: 0,
            }),
            closing: AtomicBool::new(false),
            timers: TimerRegistry::new(),
            auth_gate: tokio::sync::Mutex::new(()),
            auth_in_flight: AtomicBool::new(false),
            authenticator,
            events,
        }
    }

    /// Builder form of `set_access_token`.
    pub fn with_access_token(self, token: Secret<String>) -> Self {
        self.set_access_token(token);
        self
    }

    pub fn access_token(&self) -> Secret<String> {
        self.read_token().token.clone()
    }

    /// Current token and its generation, read together.
    pub fn token_snapshot(&self) -> (Secret<String>, u64) {
        let state = self.read_token();
        (state.token.clone(), state.generation)
    }

    pub fn token_generation(&self) -> u64 {
        self.read_token().generation
    }

    /// Install a new token and advance the generation.
    pub fn set_access_token(&self, token: Secret<String>) {
        let mut state = self.write_token();
        state.token = token;
        state.generation += 1;
        debug!(generation = state.generation, "access token updated");
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Mark the connection as closing. Never reverts.
    pub fn set_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }

    /// Mark the connection as closing and cancel every pending timer.
    pub fn close(&self) {
        self.set_closing();
        let cancelled = self.timers.cancel_all();
        info!(cancelled_timers = cancelled, "connection closing");
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn events(&self) -> &dyn SessionEvents {
        self.events.as_ref()
    }

    /// Whether this connection is currently running `Authenticator::authenticate`.
    pub fn auth_in_flight(&self) -> bool {
        self.auth_in_flight.load(Ordering::Acquire)
    }

    /// Re-authenticate after a token of generation `observed` was rejected.
    ///
    /// Concurrent callers queue on the gate; whoever gets it first
    /// authenticates, the rest see the generation moved and return at once.
    pub async fn reauthenticate(&self, observed: u64) -> Result<(), AuthError> {
        let _gate = self.auth_gate.lock().await;
        if self.token_generation() != observed {
            debug!(observed, "token already refreshed by a concurrent call");
            return Ok(());
        }

        info!("access token expired, doing a re-authorization");
        self.auth_in_flight.store(true, Ordering::Release);
        let result = self.authenticator.authenticate().await;
        self.auth_in_flight.store(false, Ordering::Release);

        match result {
            Ok(token) => {
                self.set_access_token(token);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "re-authorization failed");
                Err(e)
            }
        }
    }

    fn read_token(&self) -> RwLockReadGuard<'_, TokenState> {
        self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_token(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_token();
        f.debug_struct("Connection")
            .field("token", &state.token)
            .field("generation", &state.generation)
            .field("closing", &self.is_closing())
            .field("pending_timers", &self.timers.pending().len())
            .finish()
    }
}
