//! # WSI Bridge
//!
//! A client bridge to a running whole-slide image analysis application,
//! reachable over a remote-object call gateway.
//!
//! The application owns the images and annotations; this crate translates
//! between its remote object model and two local abstractions:
//!
//! - a tiled, multi-resolution pixel source ([`pixels::RemoteImageSource`])
//! - a GeoJSON-superset annotation exchange ([`objects`])
//!
//! Every operation is a thin sequence of synchronous remote calls, response
//! decoding and re-encoding. There is no wire protocol here: the transport
//! is supplied by the caller as an implementation of [`gateway::Gateway`].
//!
//! ## Modules
//!
//! - [`gateway`] - the call seam: sessions, remote handles, handle resolution
//! - [`pixels`] - block reads, metadata translation, transport strategies
//! - [`objects`] - annotation objects and the interchange format
//! - [`error`] - per-layer error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wsi_bridge::gateway::Session;
//! use wsi_bridge::pixels::{BlockRequest, PixelSource, RemoteImageSource};
//! use wsi_bridge::objects::get_annotations;
//!
//! # fn connect_transport() -> Arc<dyn wsi_bridge::gateway::Gateway> { unimplemented!() }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Wrap a connected transport and make it the process default.
//! let session = Session::connect_default(connect_transport());
//!
//! // Read a block from the currently open image.
//! let source = RemoteImageSource::connect(Some(&session))?;
//! let block = source.read_block(&BlockRequest::new(0, 0, 0, 512, 512))?;
//! assert_eq!((block.width(), block.height()), (512, 512));
//!
//! // Fetch its annotations.
//! let annotations = get_annotations(Some(&session), None)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod objects;
pub mod pixels;

// Re-export commonly used types
pub use error::{GatewayError, ObjectError, PixelError};
pub use gateway::{Gateway, RemoteHandle, Session};
pub use objects::{Feature, ImageObject, ObjectType};
pub use pixels::{BlockRequest, ImageMetadata, PixelBlock, PixelSource, RemoteImageSource};
