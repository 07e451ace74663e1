//! Shared constants for end-to-end tests
//!
//! When test tokens or ids change, update only this file.

// ============================================================================
// Account service tokens
// ============================================================================

/// Token the stub account service resolves to [`TEST_OWNER`]
pub const TEST_TOKEN: &str = "test-token-1";

/// Owner id behind [`TEST_TOKEN`]
pub const TEST_OWNER: &str = "owner-1";

/// Token the stub account service resolves to [`OTHER_OWNER`]
pub const OTHER_TOKEN: &str = "test-token-2";

/// Owner id behind [`OTHER_TOKEN`]
pub const OTHER_OWNER: &str = "owner-2";

/// Token the stub account service answers with a server error
pub const BROKEN_TOKEN: &str = "broken-token";

/// Token the stub account service does not know
pub const UNKNOWN_TOKEN: &str = "expired-token";

// ============================================================================
// Item ids
// ============================================================================

pub const ITEM_1_ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";
pub const ITEM_2_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";
pub const ITEM_3_ID: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout the server gives the account service (seconds)
pub const AUTH_TIMEOUT_SECS: u64 = 2;
