//! Gateway sessions and the process-wide default.
//!
//! A [`Session`] is a shared handle to one connected gateway. Call sites may
//! pass a session explicitly, or install one process-wide default so the
//! convenience operations in [`crate::objects`] and [`crate::pixels`] need
//! not thread it through every call.
//!
//! The default is shared mutable state guarded by a lock, but there is no
//! coordination beyond that: it is meant to be set once by the top-level
//! caller. Multi-threaded programs should pass explicit sessions instead of
//! relying on the default.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::error::GatewayError;

use super::transport::Gateway;

/// Process-wide default session, set explicitly by the caller.
static DEFAULT_SESSION: Mutex<Option<Session>> = Mutex::new(None);

// =============================================================================
// Session
// =============================================================================

/// A shared handle to one connected call gateway.
///
/// Sessions are cheap to clone; clones refer to the same gateway.
#[derive(Clone)]
pub struct Session {
    gateway: Arc<dyn Gateway>,
}

impl Session {
    /// Wrap a gateway implementation in a session.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Wrap a gateway and install it as the process-wide default.
    pub fn connect_default(gateway: Arc<dyn Gateway>) -> Self {
        let session = Self::new(gateway);
        set_default_session(Some(session.clone()));
        session
    }

    /// Access the underlying gateway.
    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

// =============================================================================
// Default Session
// =============================================================================

/// Set or clear the process-wide default session.
pub fn set_default_session(session: Option<Session>) {
    *DEFAULT_SESSION.lock().unwrap_or_else(|e| e.into_inner()) = session;
}

/// Clear the process-wide default session.
pub fn clear_default_session() {
    set_default_session(None);
}

/// The process-wide default session, if one has been set.
pub fn default_session() -> Option<Session> {
    DEFAULT_SESSION
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Resolve an explicit session or fall back to the default.
///
/// A gateway cannot be created implicitly, so when neither exists this is a
/// terminal configuration error.
pub fn session_or_default(session: Option<&Session>) -> Result<Session, GatewayError> {
    if let Some(session) = session {
        return Ok(session.clone());
    }
    match default_session() {
        Some(session) => Ok(session),
        None => {
            warn!("no session supplied and no default session set");
            Err(GatewayError::NoSession)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
