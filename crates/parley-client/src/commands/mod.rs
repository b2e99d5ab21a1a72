//! User-initiated requests.
//!
//! Each sub-module groups related commands by domain. Commands validate
//! their input before touching the network, never hold the session lock
//! across a request, and report failures to the user as an error banner.
//! They are not retried.

pub mod export;
pub mod streams;
pub mod subscriptions;

use tracing::warn;

use crate::error::ClientError;
use crate::projection::UiUpdate;
use crate::state::{lock_session, SharedSession};

/// Surface a failed command as an inline error banner, passing the result
/// through unchanged.
pub(crate) fn report<T>(
    session: &SharedSession,
    command: &'static str,
    result: Result<T, ClientError>,
) -> Result<T, ClientError> {
    if let Err(e) = &result {
        warn!(command, error = %e, "Command failed");
        if let Ok(mut guard) = lock_session(session) {
            guard.emit(UiUpdate::error_banner(e.banner_text()));
        }
    }
    result
}

pub(crate) fn announce(session: &SharedSession, text: &str) {
    if let Ok(mut guard) = lock_session(session) {
        guard.emit(UiUpdate::success_banner(text));
    }
}
