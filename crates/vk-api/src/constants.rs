//! VK API wire constants
//!
//! Defaults for the endpoint and the fixed recovery intervals. All of them
//! can be overridden through `ApiConfig`.

/// Base of every method URL: `{DEFAULT_BASE_URL}/{method}`
pub const DEFAULT_BASE_URL: &str = "https://api.vk.com/method";

/// Protocol version sent as `v=` with every call
pub const API_VERSION: &str = "5.0";

/// Delay before replaying a call rejected with "too many requests per second".
/// 350ms keeps us under three requests per second.
pub const RATE_LIMIT_RETRY_MS: u64 = 350;

/// Interval between checks for a token while the host is still authenticating
pub const AUTH_POLL_INTERVAL_MS: u64 = 1000;

/// Encoded length allowed for a comma-joined id list in a single request
pub const DEFAULT_ID_LIST_BUDGET: usize = 1800;

/// Re-authentication cycles allowed per logical call
pub const DEFAULT_MAX_REAUTH_ATTEMPTS: u32 = 3;

/// Parameter carrying the pagination offset
pub const OFFSET_PARAM: &str = "offset";

/// Encoded form of the id list separator (`,` → `%2C`)
pub const ENCODED_SEPARATOR_LEN: usize = 3;
