//! Remote handle resolution.
//!
//! Given an optional input handle, resolve the most specific remote handle a
//! caller needs: an image-data, an object hierarchy, or a pixel server.
//!
//! Resolution rule: if the input already carries the target capability tag,
//! return it unchanged; otherwise derive the target from an image-data
//! handle, falling back to the session's "current open image" when no input
//! is given. If nothing can be determined the result is `Ok(None)` — a soft
//! miss, not an error. Callers choose their own policy for a miss (the read
//! and delete paths warn and treat it as empty content).
//!
//! A single remote call either succeeds or the absence is reported upward;
//! there are no retries at this layer.

use crate::error::GatewayError;

use super::session::Session;
use super::transport::{RemoteHandle, RemoteTypeTag};

/// Resolve an image-data handle.
///
/// With no input, asks the session for the currently open image. With an
/// input handle, accepts it only if the gateway tags it as image-data.
pub fn resolve_image_data(
    session: &Session,
    input: Option<&RemoteHandle>,
) -> Result<Option<RemoteHandle>, GatewayError> {
    match input {
        None => session.gateway().current_image_data(),
        Some(handle) => {
            if session.gateway().type_tag(handle)? == Some(RemoteTypeTag::ImageData) {
                Ok(Some(handle.clone()))
            } else {
                Ok(None)
            }
        }
    }
}

/// Resolve an object hierarchy handle.
///
/// Accepts a hierarchy handle directly, otherwise derives one from the
/// resolved image-data.
pub fn resolve_hierarchy(
    session: &Session,
    input: Option<&RemoteHandle>,
) -> Result<Option<RemoteHandle>, GatewayError> {
    if let Some(handle) = input {
        if session.gateway().type_tag(handle)? == Some(RemoteTypeTag::ObjectHierarchy) {
            return Ok(Some(handle.clone()));
        }
    }
    match resolve_image_data(session, input)? {
        Some(image_data) => session.gateway().object_hierarchy(&image_data).map(Some),
        None => Ok(None),
    }
}

/// Resolve a pixel server handle.
///
/// Accepts a server handle directly, otherwise derives one from the resolved
/// image-data.
pub fn resolve_server(
    session: &Session,
    input: Option<&RemoteHandle>,
) -> Result<Option<RemoteHandle>, GatewayError> {
    if let Some(handle) = input {
        if session.gateway().type_tag(handle)? == Some(RemoteTypeTag::ImageServer) {
            return Ok(Some(handle.clone()));
        }
    }
    match resolve_image_data(session, input)? {
        Some(image_data) => session.gateway().image_server(&image_data).map(Some),
        None => Ok(None),
    }
}
