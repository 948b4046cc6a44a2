//! Pixel access layer.
//!
//! Presents a remote image server as a local tiled image:
//!
//! - [`block`] - block requests, typed pixel blocks and resampling
//! - [`metadata`] - translation of remote server facts into local metadata
//! - [`source`] - the remote-backed [`PixelSource`] and transport strategies
//!
//! Decoding of the interchange payloads lives in a private `decode` module.

mod block;
mod decode;
mod metadata;
mod source;

pub use block::{BlockRequest, PixelBlock, PixelDataType, ResizeMethod, Samples};
pub use metadata::{
    unpack_color, ImageChannel, ImageMetadata, ImageShape, LengthUnit, PixelCalibration,
    PixelLength,
};
pub use source::{PixelAccess, PixelSource, RemoteImageSource, INTERCHANGE_FORMAT};
