//! Call metrics
//!
//! - `vk_api_calls_total` (counter): labels `method`, `outcome`
//! - `vk_api_recoveries_total` (counter): label `action`
//!
//! Without an installed recorder these are no-ops.

use crate::error::Result;

/// Record the final outcome of one top-level call.
pub fn record_call<T>(method: &str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.outcome_label(),
    };
    metrics::counter!("vk_api_calls_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record a recovery action chosen by the dispatcher.
pub fn record_recovery(action: &'static str) {
    metrics::counter!("vk_api_recoveries_total", "action" => action).increment(1);
}
