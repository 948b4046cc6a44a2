//! Metadata translation.
//!
//! Maps the raw facts a gateway reports about a remote image server
//! ([`ServerDescription`]) into the local metadata model: calibrated pixel
//! sizes in microns, per-level shapes, normalized datatype names, unpacked
//! channel colors and a usable path.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PixelError;
use crate::gateway::ServerDescription;

use super::block::PixelDataType;

// =============================================================================
// Shapes
// =============================================================================

/// Dimensions of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    /// Width in pixels.
    pub x: u32,

    /// Height in pixels.
    pub y: u32,

    /// Number of channels.
    pub c: u32,

    /// Number of z-slices.
    pub z: u32,

    /// Number of timepoints.
    pub t: u32,
}

// =============================================================================
// Calibration
// =============================================================================

/// Unit of a pixel length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Uncalibrated: lengths are in pixels.
    #[default]
    Pixels,

    /// Calibrated physical length in micrometers.
    Micrometers,
}

/// Physical length of one pixel along one axis.
///
/// The default is an uncalibrated length of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelLength {
    pub length: f64,
    pub unit: LengthUnit,
}

impl Default for PixelLength {
    fn default() -> Self {
        Self {
            length: 1.0,
            unit: LengthUnit::Pixels,
        }
    }
}

impl PixelLength {
    /// A calibrated length in micrometers.
    pub fn microns(length: f64) -> Self {
        Self {
            length,
            unit: LengthUnit::Micrometers,
        }
    }

    /// Whether this length carries a physical unit.
    pub fn is_calibrated(&self) -> bool {
        self.unit != LengthUnit::Pixels
    }
}

/// Pixel calibration along the x, y and z axes.
///
/// A zero or absent z-spacing means "no z calibration", never a z-length of
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelCalibration {
    pub length_x: PixelLength,
    pub length_y: PixelLength,
    pub length_z: PixelLength,
}

impl PixelCalibration {
    /// Whether x and y carry physical units.
    pub fn is_calibrated(&self) -> bool {
        self.length_x.is_calibrated() && self.length_y.is_calibrated()
    }
}

// =============================================================================
// Channels
// =============================================================================

/// One image channel with a normalized display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageChannel {
    /// Channel name.
    pub name: String,

    /// Display color as normalized `(red, green, blue)`, each in `0.0..=1.0`.
    pub color: (f64, f64, f64),
}

/// Unpack a 24-bit packed color into normalized RGB components.
pub fn unpack_color(rgb: u32) -> (f64, f64, f64) {
    let r = (rgb >> 16) & 0xFF;
    let g = (rgb >> 8) & 0xFF;
    let b = rgb & 0xFF;
    (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
}

// =============================================================================
// Image Metadata
// =============================================================================

/// Local metadata model for one remote image server.
///
/// Computed once when first needed and treated as immutable afterward; the
/// remote side cannot report a changed image, so there is no invalidation
/// hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Local filesystem path when the server maps to a single `file://` URI,
    /// otherwise the path string reported by the remote side.
    pub path: String,

    /// Display name.
    pub name: String,

    /// Pixel calibration, identity when the remote side is uncalibrated.
    pub calibration: PixelCalibration,

    /// Per-level shapes, highest resolution first. Always the same length
    /// as [`downsamples`](Self::downsamples).
    pub shapes: Vec<ImageShape>,

    /// Preferred downsample factor per level, taken from the remote side
    /// verbatim.
    pub downsamples: Vec<f64>,

    /// Normalized pixel datatype.
    pub dtype: PixelDataType,

    /// Whether pixels are packed RGB.
    pub is_rgb: bool,

    /// Channels with unpacked colors.
    pub channels: Vec<ImageChannel>,
}

impl ImageMetadata {
    /// Translate a remote server description into the local model.
    pub fn from_description(desc: &ServerDescription) -> Result<Self, PixelError> {
        if desc.levels.len() != desc.downsamples.len() {
            return Err(PixelError::Metadata(format!(
                "{} level(s) but {} downsample(s)",
                desc.levels.len(),
                desc.downsamples.len()
            )));
        }
        if desc.levels.is_empty() {
            return Err(PixelError::Metadata("no pyramid levels".to_string()));
        }

        let shapes = desc
            .levels
            .iter()
            .map(|level| ImageShape {
                x: level.width,
                y: level.height,
                c: desc.n_channels,
                z: desc.n_z_slices,
                t: desc.n_timepoints,
            })
            .collect();

        let dtype = PixelDataType::parse(&desc.pixel_type)?;

        let calibration = match (desc.pixel_width_microns, desc.pixel_height_microns) {
            (Some(width), Some(height)) => PixelCalibration {
                length_x: PixelLength::microns(width),
                length_y: PixelLength::microns(height),
                // Zero and absent z-spacing both mean uncalibrated.
                length_z: match desc.z_spacing_microns {
                    Some(spacing) if spacing != 0.0 => PixelLength::microns(spacing),
                    _ => PixelLength::default(),
                },
            },
            _ => PixelCalibration::default(),
        };

        let channels = desc
            .channels
            .iter()
            .map(|channel| ImageChannel {
                name: channel.name.clone(),
                color: unpack_color(channel.color),
            })
            .collect();

        let path = find_local_path(&desc.uris).unwrap_or_else(|| desc.path.clone());

        Ok(Self {
            path,
            name: desc.name.clone(),
            calibration,
            shapes,
            downsamples: desc.downsamples.clone(),
            dtype,
            is_rgb: desc.is_rgb,
            channels,
        })
    }

    /// Number of pyramid levels.
    pub fn level_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of channels.
    pub fn n_channels(&self) -> u32 {
        self.shapes.first().map(|shape| shape.c).unwrap_or(0)
    }
}

/// Resolve a local filesystem path from the server's URIs.
///
/// Only a server backed by exactly one `file://` URI maps to a local path;
/// the percent-encoded path component is decoded.
fn find_local_path(uris: &[String]) -> Option<String> {
    let [uri] = uris else {
        return None;
    };
    let parsed = Url::parse(uri).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    Some(urlencoding::decode(parsed.path()).ok()?.into_owned())
}

// =============================================================================
// Tests
// =============================================================================
