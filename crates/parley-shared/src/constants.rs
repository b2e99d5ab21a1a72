/// Role codes as sent by the server
pub const ROLE_OWNER: u16 = 100;
pub const ROLE_ADMINISTRATOR: u16 = 200;
pub const ROLE_MODERATOR: u16 = 300;
pub const ROLE_MEMBER: u16 = 400;
pub const ROLE_GUEST: u16 = 600;

/// Display name given to users the client can no longer see
pub const UNKNOWN_USER_NAME: &str = "Unknown user";

/// Maximum number of matches_narrow attempts before giving up
pub const NARROW_CHECK_MAX_ATTEMPTS: u32 = 5;

/// Base of the full-jitter backoff, in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 2000;

/// Explicit timeout for the matches_narrow request, in milliseconds
pub const NARROW_CHECK_TIMEOUT_MS: u64 = 5000;

/// Messages taller than this fraction of the viewport may be condensed
pub const CONDENSE_VIEWPORT_RATIO: f64 = 0.65;

/// Longest delay the event poller waits between failed polls, in milliseconds
pub const EVENT_POLL_MAX_BACKOFF_MS: u64 = 90_000;

/// Error code the server returns once an event queue has been garbage-collected
pub const BAD_EVENT_QUEUE_ID: &str = "BAD_EVENT_QUEUE_ID";
