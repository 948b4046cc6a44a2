//! Call gateway layer.
//!
//! Everything that talks to the remote application lives here:
//!
//! - [`transport`] - the [`Gateway`] trait, remote handles and transport DTOs
//! - [`session`] - shared sessions and the process-wide default
//! - [`resolve`] - turning arbitrary inputs into specific remote handles

mod resolve;
mod session;
mod transport;

pub use resolve::{resolve_hierarchy, resolve_image_data, resolve_server};
pub use session::{
    clear_default_session, default_session, session_or_default, set_default_session, Session,
};
pub use transport::{
    ChannelDescription, Gateway, LevelDescription, ObjectSelector, RegionRequest, RemoteHandle,
    RemoteTypeTag, ServerDescription,
};
