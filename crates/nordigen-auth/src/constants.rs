//! API endpoint constants

use std::time::Duration;

/// Production API base: scheme, host, and version prefix.
pub const DEFAULT_BASE_URL: &str = "https://bankaccountdata.gocardless.com/api/v2";

/// Full authentication with secret id/key. The trailing slash is required.
pub const TOKEN_NEW_PATH: &str = "token/new/";

/// Access token renewal with a refresh token.
pub const TOKEN_REFRESH_PATH: &str = "token/refresh/";

/// Per-request timeout for the underlying HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
