//! Remote call seam.
//!
//! This module defines the [`Gateway`] trait, the synchronous remote-object
//! invocation surface this crate is built against. A gateway implementation
//! wraps whatever transport connects to the running analysis application;
//! this crate never touches the wire itself.
//!
//! Remote objects are represented by opaque [`RemoteHandle`]s. Instead of
//! dispatching on remote class-name strings, handles are classified by a
//! small set of [`RemoteTypeTag`] capability tags reported by the gateway.

use std::fmt;
use std::path::Path;

use bytes::Bytes;

use crate::error::GatewayError;
use crate::objects::ObjectType;

// =============================================================================
// Remote Handles
// =============================================================================

/// Opaque reference to an object living in the external application's process.
///
/// Handles are cheap to clone and carry no local state beyond an identifier
/// assigned by the gateway implementation. All behavior lives on the remote
/// side; a handle is only meaningful to the gateway that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteHandle {
    id: u64,
}

impl RemoteHandle {
    /// Create a handle with a gateway-assigned identifier.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The gateway-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote#{}", self.id)
    }
}

/// Capability tags for the remote types this crate needs to recognize.
///
/// A gateway reports at most one tag per handle; handles for any other
/// remote type report `None` and are treated as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteTypeTag {
    /// An open image: owns a pixel server and an object hierarchy.
    ImageData,

    /// The container of spatial annotation objects for one open image.
    ObjectHierarchy,

    /// A tiled, multi-resolution pixel server.
    ImageServer,
}

// =============================================================================
// Region Requests
// =============================================================================

/// Describes one requested pixel block in full-resolution coordinates.
///
/// Built fresh per read by [`RemoteImageSource`](crate::pixels::RemoteImageSource)
/// and never persisted. The x/y/width/height fields are already scaled by the
/// level downsample and rounded, matching the remote side's own tiling.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRequest {
    /// Downsample factor of the resolved pyramid level.
    pub downsample: f64,

    /// Left edge in full-resolution pixels.
    pub x: i32,

    /// Top edge in full-resolution pixels.
    pub y: i32,

    /// Width in full-resolution pixels.
    pub width: i32,

    /// Height in full-resolution pixels.
    pub height: i32,

    /// Z-slice index.
    pub z: i32,

    /// Timepoint index.
    pub t: i32,
}

// =============================================================================
// Server Description
// =============================================================================

/// Dimensions of one pyramid level as reported by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDescription {
    pub width: u32,
    pub height: u32,
}

/// Raw facts about a remote image server, as reported by the remote side.
///
/// This is a transport DTO: values are untranslated (packed colors, remote
/// datatype names, undecoded URIs). [`ImageMetadata`](crate::pixels::ImageMetadata)
/// is derived from it by the metadata translator.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDescription {
    /// Display name reported by the remote metadata.
    pub name: String,

    /// Path string reported by the remote server, used as a fallback when no
    /// single local `file://` URI exists.
    pub path: String,

    /// URIs backing the remote server, in remote order.
    pub uris: Vec<String>,

    /// Remote pixel datatype name, e.g. `"UINT8"` or `"FLOAT32"`.
    pub pixel_type: String,

    /// Whether the server reports packed RGB pixels.
    pub is_rgb: bool,

    /// Preferred downsample factor per level. Authoritative: never
    /// recomputed locally.
    pub downsamples: Vec<f64>,

    /// Per-level dimensions, highest resolution first.
    pub levels: Vec<LevelDescription>,

    /// Number of channels.
    pub n_channels: u32,

    /// Number of z-slices.
    pub n_z_slices: u32,

    /// Number of timepoints.
    pub n_timepoints: u32,

    /// Physical pixel width in microns, if calibrated.
    pub pixel_width_microns: Option<f64>,

    /// Physical pixel height in microns, if calibrated.
    pub pixel_height_microns: Option<f64>,

    /// Z-spacing in microns. Zero and absent both mean "no z calibration".
    pub z_spacing_microns: Option<f64>,

    /// Channel names with packed 24-bit RGB colors.
    pub channels: Vec<ChannelDescription>,
}

/// One channel as reported by the remote server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescription {
    /// Channel name.
    pub name: String,

    /// Packed 24-bit color (`0xRRGGBB`).
    pub color: u32,
}

// =============================================================================
// Object Selection
// =============================================================================

/// Which objects to fetch from an object hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSelector {
    /// Every object in the hierarchy.
    All,

    /// Objects of one category.
    Kind(ObjectType),
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Synchronous remote method invocation against a running analysis
/// application.
///
/// Every method blocks the caller until the remote side responds. This trait
/// performs no retries, no caching and no connection pooling; a failed call
/// surfaces as a [`GatewayError`] and is reported upward unmodified.
///
/// Implementations wrap a concrete transport (the external collaborator).
/// Tests use an in-memory implementation backed by synthetic images and an
/// object store.
pub trait Gateway: Send + Sync {
    /// Classify a remote handle by capability tag.
    ///
    /// Returns `None` for handles of remote types this crate does not model.
    fn type_tag(&self, handle: &RemoteHandle) -> Result<Option<RemoteTypeTag>, GatewayError>;

    /// The image-data currently open in the application, if any.
    fn current_image_data(&self) -> Result<Option<RemoteHandle>, GatewayError>;

    /// The pixel server owned by an image-data handle.
    fn image_server(&self, image_data: &RemoteHandle) -> Result<RemoteHandle, GatewayError>;

    /// The object hierarchy owned by an image-data handle.
    fn object_hierarchy(&self, image_data: &RemoteHandle) -> Result<RemoteHandle, GatewayError>;

    /// Describe a remote image server (metadata snapshot).
    fn server_description(
        &self,
        server: &RemoteHandle,
    ) -> Result<ServerDescription, GatewayError>;

    /// Ask the remote side to write an encoded image region to a local file.
    ///
    /// `format` names the interchange encoding, e.g. `"imagej tiff"`.
    fn write_image_region(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        path: &Path,
        format: &str,
    ) -> Result<(), GatewayError>;

    /// Fetch an encoded image region as raw bytes.
    fn read_image_bytes(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        format: &str,
    ) -> Result<Bytes, GatewayError>;

    /// Fetch an encoded image region as base64 text.
    ///
    /// Some gateway transports mangle binary payloads; this strategy keeps
    /// the response in the text channel.
    fn read_image_base64(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        format: &str,
    ) -> Result<String, GatewayError>;

    /// Select objects from a hierarchy.
    ///
    /// Returns a handle to a remote object list, or `None` when the
    /// selection source is absent (e.g. no TMA grid exists for
    /// [`ObjectType::TmaCore`](crate::objects::ObjectType)).
    fn select_objects(
        &self,
        hierarchy: &RemoteHandle,
        selector: ObjectSelector,
    ) -> Result<Option<RemoteHandle>, GatewayError>;

    /// Convert a remote object list to interchange text, in batches.
    ///
    /// Each returned string is one feature collection covering at most
    /// `batch_size` objects, in hierarchy order.
    fn to_feature_collections(
        &self,
        objects: &RemoteHandle,
        batch_size: usize,
    ) -> Result<Vec<String>, GatewayError>;

    /// Convert interchange text to a remote object list.
    fn to_remote_objects(&self, feature_json: &str) -> Result<RemoteHandle, GatewayError>;

    /// Append a remote object list to a hierarchy.
    fn insert_objects(
        &self,
        hierarchy: &RemoteHandle,
        objects: &RemoteHandle,
    ) -> Result<(), GatewayError>;

    /// Remove the objects in a remote object list from a hierarchy.
    fn remove_objects(
        &self,
        hierarchy: &RemoteHandle,
        objects: &RemoteHandle,
    ) -> Result<(), GatewayError>;

    /// Remove every object from a hierarchy in one call.
    fn clear_all_objects(&self, hierarchy: &RemoteHandle) -> Result<(), GatewayError>;
}

// =============================================================================
// Tests
// =============================================================================
