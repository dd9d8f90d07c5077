//! Test doubles for the transport and session collaborators

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::Secret;
use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::connection::{Authenticator, Connection, SessionEvents};
use crate::error::{AuthError, TransportError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

type Reply = Result<HttpResponse, TransportError>;
type Responder = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order; panics when the script runs out.
    pub fn scripted(replies: Vec<Reply>) -> Self {
        let replies = Mutex::new(VecDeque::from(replies));
        Self::new(move |request| {
            replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request: {}", request.url))
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

impl HttpTransport for MockTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Reply> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            // Completion arrives on a later poll, like a real exchange.
            tokio::task::yield_now().await;
            (self.responder)(&request)
        })
    }
}

/// 200 reply with `{"response": value}`.
pub fn ok(value: Value) -> Reply {
    Ok(HttpResponse {
        status: 200,
        body: json!({ "response": value }).to_string(),
    })
}

/// 200 reply carrying an API error object.
pub fn api_error(code: i64) -> Reply {
    raw_error(json!({ "error_code": code, "error_msg": format!("error {code}") }))
}

pub fn raw_error(error: Value) -> Reply {
    Ok(HttpResponse {
        status: 200,
        body: json!({ "error": error }).to_string(),
    })
}

pub fn body(status: u16, body: &str) -> Reply {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

/// Value of a query parameter in a recorded URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.into_owned())
}

/// Authenticator handing out a fixed token (or failing) and counting calls.
pub struct StubAuthenticator {
    token: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubAuthenticator {
    pub fn returning(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Like `returning`, but authentication takes `delay`.
    pub fn slow(token: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::returning(token)
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authenticator for StubAuthenticator {
    fn authenticate(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>, AuthError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.token {
                Some(token) => Ok(Secret::new(token.clone())),
                None => Err(AuthError::Failed("invalid credentials".into())),
            }
        })
    }
}

/// Records session events for assertions.
#[derive(Default)]
pub struct RecordingEvents {
    validations: Mutex<Vec<Option<String>>>,
    fatal: Mutex<Vec<String>>,
}

impl RecordingEvents {
    pub fn validations(&self) -> Vec<Option<String>> {
        self.validations.lock().unwrap().clone()
    }

    pub fn fatal(&self) -> Vec<String> {
        self.fatal.lock().unwrap().clone()
    }
}

impl SessionEvents for RecordingEvents {
    fn validation_required(&self, redirect_uri: Option<&str>) {
        self.validations
            .lock()
            .unwrap()
            .push(redirect_uri.map(str::to_owned));
    }

    fn fatal_error(&self, message: &str) {
        self.fatal.lock().unwrap().push(message.to_string());
    }
}

/// A client wired to doubles, plus handles to inspect them.
pub struct Harness {
    pub client: ApiClient,
    pub transport: Arc<MockTransport>,
    pub auth: Arc<StubAuthenticator>,
    pub events: Arc<RecordingEvents>,
}

impl Harness {
    /// Connection authenticated with `tok-1`; re-authentication yields `tok-2`.
    pub fn new(transport: MockTransport) -> Self {
        Self::with(transport, StubAuthenticator::returning("tok-2"), Some("tok-1"))
    }

    pub fn with(transport: MockTransport, auth: StubAuthenticator, token: Option<&str>) -> Self {
        let transport = Arc::new(transport);
        let auth = Arc::new(auth);
        let events = Arc::new(RecordingEvents::default());
        let connection = Connection::new(auth.clone(), events.clone());
        if let Some(token) = token {
            connection.set_access_token(Secret::new(token.to_string()));
        }
        let client = ApiClient::new(Arc::new(connection), transport.clone(), ApiConfig::default());
        Self {
            client,
            transport,
            auth,
            events,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        self.client.connection()
    }
}

impl Harness {
    /// Rebuild the client with a different engine configuration.
    pub fn configure(mut self, config: ApiConfig) -> Self {
        let connection = Arc::clone(self.client.connection());
        self.client = ApiClient::new(connection, self.transport.clone(), config);
        self
    }
}
