//! Console handling of session events

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};
use vk_api::SessionEvents;

/// Reports validation demands and fatal errors on the console.
#[derive(Debug, Default)]
pub struct ConsoleEvents {
    fatal: AtomicBool,
}

impl ConsoleEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session reported a fatal error.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::Acquire)
    }
}

impl SessionEvents for ConsoleEvents {
    fn validation_required(&self, redirect_uri: Option<&str>) {
        warn!(redirect_uri, "account validation required");
        match redirect_uri {
            Some(uri) => eprintln!("validation required, open: {uri}"),
            None => eprintln!("validation required"),
        }
    }

    fn fatal_error(&self, message: &str) {
        error!(message, "fatal session error");
        self.fatal.store(true, Ordering::Release);
    }
}
