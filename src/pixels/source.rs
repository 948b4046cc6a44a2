//! Remote pixel source.
//!
//! [`RemoteImageSource`] presents a tiled, multi-resolution image backed by
//! remote calls. Each block read builds a [`RegionRequest`], fetches encoded
//! pixel bytes through one of three transport strategies, decodes and
//! reshapes to the requested block bounds.
//!
//! Metadata is derived lazily on first access and never recomputed; the
//! remote side has no way to report a changed image.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::error::PixelError;
use crate::gateway::{resolve_server, session_or_default, RegionRequest, RemoteHandle, Session};

use super::block::{BlockRequest, PixelBlock, ResizeMethod};
use super::decode;
use super::metadata::ImageMetadata;

/// Interchange encoding requested from the remote side.
///
/// Multi-channel payloads need a multi-plane container, and the remote
/// writer produces the same container for 2D images, so every request uses
/// it uniformly.
pub const INTERCHANGE_FORMAT: &str = "imagej tiff";

// =============================================================================
// Pixel Access Strategies
// =============================================================================

/// How encoded pixel bytes travel from the remote side.
///
/// Selected once at construction and fixed for the source's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelAccess {
    /// The remote side writes the region to a local temporary file.
    ///
    /// Fastest, but requires a filesystem shared with the application.
    TempFile,

    /// Encoded bytes are returned directly over the gateway.
    Bytes,

    /// Encoded bytes are returned base64-encoded as text.
    ///
    /// Avoids binary-transport issues in some gateway implementations, and
    /// tends to be faster than [`PixelAccess::Bytes`].
    #[default]
    Base64,
}

// =============================================================================
// Pixel Source Trait
// =============================================================================

/// A tiled, multi-resolution image exposing block reads.
pub trait PixelSource {
    /// Metadata for the image, computed on first access.
    fn metadata(&self) -> Result<Arc<ImageMetadata>, PixelError>;

    /// Read one pixel block.
    ///
    /// The returned block always has exactly the requested width and height.
    fn read_block(&self, request: &BlockRequest) -> Result<PixelBlock, PixelError>;

    /// Preferred downsample factor per level.
    fn downsamples(&self) -> Result<Vec<f64>, PixelError> {
        Ok(self.metadata()?.downsamples.clone())
    }

    /// Number of pyramid levels.
    fn level_count(&self) -> Result<usize, PixelError> {
        Ok(self.metadata()?.level_count())
    }
}

// =============================================================================
// Remote Image Source
// =============================================================================

/// A pixel source backed by a remote image server.
pub struct RemoteImageSource {
    session: Session,
    server: RemoteHandle,
    access: PixelAccess,
    resize: ResizeMethod,
    metadata: Mutex<Option<Arc<ImageMetadata>>>,
}

impl RemoteImageSource {
    /// Connect to the image currently open in the application.
    ///
    /// Falls back to the default session when `session` is `None`. Fails
    /// with a configuration error when no usable session exists, and with
    /// [`PixelError::ServerNotFound`] when no image is open.
    pub fn connect(session: Option<&Session>) -> Result<Self, PixelError> {
        let session = session_or_default(session)?;
        let server = resolve_server(&session, None)?.ok_or(PixelError::ServerNotFound)?;
        Ok(Self::with_server(session, server))
    }

    /// Wrap an explicit remote server handle.
    pub fn with_server(session: Session, server: RemoteHandle) -> Self {
        Self {
            session,
            server,
            access: PixelAccess::default(),
            resize: ResizeMethod::default(),
            metadata: Mutex::new(None),
        }
    }

    /// Choose the pixel access strategy (fixed for the source's lifetime).
    pub fn access(mut self, access: PixelAccess) -> Self {
        self.access = access;
        self
    }

    /// Choose how shape-mismatched blocks are resampled.
    pub fn resize_method(mut self, method: ResizeMethod) -> Self {
        self.resize = method;
        self
    }

    /// The remote server handle this source reads from.
    pub fn server(&self) -> &RemoteHandle {
        &self.server
    }

    /// The session this source calls through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch and decode one region through the configured strategy.
    fn fetch(&self, region: &RegionRequest, is_rgb: bool) -> Result<PixelBlock, PixelError> {
        let gateway = self.session.gateway();
        match self.access {
            PixelAccess::TempFile => {
                // The temp file is removed on drop, decode failure included.
                let file = tempfile::Builder::new()
                    .prefix("wsi-bridge-")
                    .suffix(".tif")
                    .tempfile()?;
                gateway.write_image_region(&self.server, region, file.path(), INTERCHANGE_FORMAT)?;
                decode::decode_path(file.path(), is_rgb)
            }
            PixelAccess::Bytes => {
                let payload =
                    gateway.read_image_bytes(&self.server, region, INTERCHANGE_FORMAT)?;
                decode::decode_payload(&payload, is_rgb)
            }
            PixelAccess::Base64 => {
                let text = gateway.read_image_base64(&self.server, region, INTERCHANGE_FORMAT)?;
                let payload = STANDARD.decode(text.trim())?;
                decode::decode_payload(&payload, is_rgb)
            }
        }
    }
}

impl PixelSource for RemoteImageSource {
    fn metadata(&self) -> Result<Arc<ImageMetadata>, PixelError> {
        let mut cached = self.metadata.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(metadata) = cached.as_ref() {
            return Ok(Arc::clone(metadata));
        }
        let description = self.session.gateway().server_description(&self.server)?;
        let metadata = Arc::new(ImageMetadata::from_description(&description)?);
        *cached = Some(Arc::clone(&metadata));
        Ok(metadata)
    }

    fn read_block(&self, request: &BlockRequest) -> Result<PixelBlock, PixelError> {
        request.validate()?;
        let metadata = self.metadata()?;
        let level = request.resolve_level(metadata.level_count())?;
        let downsample = metadata.downsamples[level];

        // Scale to full resolution, then round: rounding before scaling
        // would disagree with the remote side's own tiling.
        let region = RegionRequest {
            downsample,
            x: (request.x as f64 * downsample).round() as i32,
            y: (request.y as f64 * downsample).round() as i32,
            width: (request.width as f64 * downsample).round() as i32,
            height: (request.height as f64 * downsample).round() as i32,
            z: request.z,
            t: request.t,
        };

        let started = Instant::now();
        let block = self.fetch(&region, metadata.is_rgb)?;
        debug!(
            level,
            x = request.x,
            y = request.y,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "read block"
        );

        let (width, height) = (request.width as u32, request.height as u32);
        if block.width() != width || block.height() != height {
            // Expected at low-resolution levels, where rounding the scaled
            // region shifts the decoded extent by a pixel or two.
            warn!(
                decoded_width = block.width(),
                decoded_height = block.height(),
                requested_width = width,
                requested_height = height,
                "reshaping decoded block to requested size"
            );
            return Ok(block.resize(width, height, self.resize));
        }
        Ok(block)
    }
}
