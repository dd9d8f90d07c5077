//! Token-file authenticator
//!
//! Re-authentication re-reads the configured token file, so an external
//! process can rotate the token without restarting the caller.

use common::Secret;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tracing::info;
use vk_api::{AuthError, Authenticator};

/// Reads the access token from a file on every authentication.
#[derive(Debug, Default)]
pub struct TokenFileAuthenticator {
    path: Option<PathBuf>,
}

impl TokenFileAuthenticator {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    async fn read_token(&self) -> Result<Secret<String>, AuthError> {
        let path = self.path.as_ref().ok_or_else(|| {
            AuthError::Unavailable("no token_file configured for re-authentication".into())
        })?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::Failed(format!("reading {}: {e}", path.display())))?;
        let token = contents.trim();
        if token.is_empty() {
            return Err(AuthError::Failed(format!("{} is empty", path.display())));
        }
        info!(path = %path.display(), "access token reloaded");
        Ok(Secret::new(token.to_owned()))
    }
}

impl Authenticator for TokenFileAuthenticator {
    fn authenticate(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>, AuthError>> + Send + '_>> {
        Box::pin(self.read_token())
    }
}
