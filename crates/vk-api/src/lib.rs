//! VK API call orchestration
//!
//! Issues authenticated calls against the VK JSON API and hides the
//! transient failure modes from callers: expired tokens are refreshed and
//! the call replayed, rate-limited calls are retried after a short delay,
//! flood-control rejections are dropped. On top of single calls it drives
//! offset pagination and id-list batching.
//!
//! Building blocks:
//! 1. `Connection` holds the session token, closing flag and timers
//! 2. `HttpTransport` performs one HTTP exchange (`ReqwestTransport` in production)
//! 3. `ApiClient::call` issues one call and dispatches API errors
//! 4. `ApiClient::call_paginated` / `ApiClient::call_batched` drive call sequences

pub mod batch;
pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod paginate;
pub mod params;
pub mod timer;
pub mod transport;

#[cfg(test)]
mod testing;

pub use batch::chunk_ids;
pub use client::ApiClient;
pub use config::{ApiConfig, TransportConfig};
pub use connection::{Authenticator, Connection, SessionEvents};
pub use dispatch::{Recovery, classify};
pub use envelope::{ApiError, Envelope, ErrorCode, Page};
pub use error::{AuthError, Error, Result, TransportError};
pub use paginate::Pagination;
pub use params::{CallParameters, StoredCall};
pub use timer::{ScheduledTimer, TimerId, TimerRegistry};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
