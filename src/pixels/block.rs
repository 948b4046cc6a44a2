//! Block requests and decoded pixel blocks.
//!
//! A [`BlockRequest`] addresses one pixel block in level coordinates; a
//! [`PixelBlock`] holds the decoded result, row-major with channels last.
//! The resize utility enforces the contract that a returned block always has
//! exactly the requested width and height, whatever shape the transport
//! delivered.

use serde::{Deserialize, Serialize};

use crate::error::PixelError;

// =============================================================================
// Pixel Datatypes
// =============================================================================

/// Normalized pixel datatype.
///
/// Parsed from the remote server's datatype name (`"UINT8"`, `"FLOAT32"`,
/// ...); [`PixelDataType::name`] yields the normalized lowercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelDataType {
    UInt8,
    UInt16,
    UInt32,
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl PixelDataType {
    /// Parse a remote datatype name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self, PixelError> {
        match name.to_ascii_lowercase().as_str() {
            "uint8" => Ok(PixelDataType::UInt8),
            "uint16" => Ok(PixelDataType::UInt16),
            "uint32" => Ok(PixelDataType::UInt32),
            "int8" => Ok(PixelDataType::Int8),
            "int16" => Ok(PixelDataType::Int16),
            "int32" => Ok(PixelDataType::Int32),
            "float32" => Ok(PixelDataType::Float32),
            "float64" => Ok(PixelDataType::Float64),
            _ => Err(PixelError::UnsupportedDataType(name.to_string())),
        }
    }

    /// Normalized lowercase datatype name.
    pub fn name(&self) -> &'static str {
        match self {
            PixelDataType::UInt8 => "uint8",
            PixelDataType::UInt16 => "uint16",
            PixelDataType::UInt32 => "uint32",
            PixelDataType::Int8 => "int8",
            PixelDataType::Int16 => "int16",
            PixelDataType::Int32 => "int32",
            PixelDataType::Float32 => "float32",
            PixelDataType::Float64 => "float64",
        }
    }

    /// Size of one sample in bytes.
    pub fn sample_bytes(&self) -> usize {
        match self {
            PixelDataType::UInt8 | PixelDataType::Int8 => 1,
            PixelDataType::UInt16 | PixelDataType::Int16 => 2,
            PixelDataType::UInt32 | PixelDataType::Int32 | PixelDataType::Float32 => 4,
            PixelDataType::Float64 => 8,
        }
    }
}

// =============================================================================
// Samples
// =============================================================================

/// Typed sample storage for one decoded block.
///
/// Samples are stored row-major, channels last: index
/// `(y * width + x) * channels + c`.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::I8(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::I32(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    /// Whether the storage holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The datatype of the stored samples.
    pub fn data_type(&self) -> PixelDataType {
        match self {
            Samples::U8(_) => PixelDataType::UInt8,
            Samples::U16(_) => PixelDataType::UInt16,
            Samples::U32(_) => PixelDataType::UInt32,
            Samples::I8(_) => PixelDataType::Int8,
            Samples::I16(_) => PixelDataType::Int16,
            Samples::I32(_) => PixelDataType::Int32,
            Samples::F32(_) => PixelDataType::Float32,
            Samples::F64(_) => PixelDataType::Float64,
        }
    }
}

// =============================================================================
// Pixel Blocks
// =============================================================================

/// One decoded pixel block.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBlock {
    width: u32,
    height: u32,
    channels: u32,
    samples: Samples,
}

impl PixelBlock {
    /// Create a block, checking that the sample count matches the shape.
    pub fn new(
        width: u32,
        height: u32,
        channels: u32,
        samples: Samples,
    ) -> Result<Self, PixelError> {
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(PixelError::Decode(format!(
                "sample count {} does not match shape {}x{}x{}",
                samples.len(),
                height,
                width,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of channels.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Shape as `(height, width, channels)`.
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.height, self.width, self.channels)
    }

    /// The sample datatype.
    pub fn data_type(&self) -> PixelDataType {
        self.samples.data_type()
    }

    /// Typed sample storage.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Consume the block, returning its sample storage.
    pub fn into_samples(self) -> Samples {
        self.samples
    }

    /// Resample to the given size.
    ///
    /// The sample datatype and channel count are preserved. Used to restore
    /// the requested block shape when the transport returns a
    /// differently-shaped payload.
    pub fn resize(&self, width: u32, height: u32, method: ResizeMethod) -> PixelBlock {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let c = self.channels as usize;
        let src = (self.width as usize, self.height as usize);
        let dst = (width as usize, height as usize);
        let samples = match &self.samples {
            Samples::U8(v) => Samples::U8(resize_plane(v, src, dst, c, method)),
            Samples::U16(v) => Samples::U16(resize_plane(v, src, dst, c, method)),
            Samples::U32(v) => Samples::U32(resize_plane(v, src, dst, c, method)),
            Samples::I8(v) => Samples::I8(resize_plane(v, src, dst, c, method)),
            Samples::I16(v) => Samples::I16(resize_plane(v, src, dst, c, method)),
            Samples::I32(v) => Samples::I32(resize_plane(v, src, dst, c, method)),
            Samples::F32(v) => Samples::F32(resize_plane(v, src, dst, c, method)),
            Samples::F64(v) => Samples::F64(resize_plane(v, src, dst, c, method)),
        };
        PixelBlock {
            width,
            height,
            channels: self.channels,
            samples,
        }
    }
}

// =============================================================================
// Block Requests
// =============================================================================

/// A request for one pixel block, in level coordinates.
///
/// `level` may be negative, counting from the end of the pyramid: `-1` is
/// the last (lowest resolution) level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    /// Pyramid level index, possibly negative.
    pub level: i32,

    /// Left edge in level coordinates.
    pub x: i32,

    /// Top edge in level coordinates.
    pub y: i32,

    /// Width in level pixels.
    pub width: i32,

    /// Height in level pixels.
    pub height: i32,

    /// Z-slice index.
    pub z: i32,

    /// Timepoint index.
    pub t: i32,
}

impl BlockRequest {
    /// Create a request on the first z-slice and timepoint.
    pub fn new(level: i32, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            level,
            x,
            y,
            width,
            height,
            z: 0,
            t: 0,
        }
    }

    /// Set the z-slice and timepoint.
    pub fn with_plane(mut self, z: i32, t: i32) -> Self {
        self.z = z;
        self.t = t;
        self
    }

    /// Check basic bounds: positive extent, non-negative origin and plane.
    pub fn validate(&self) -> Result<(), PixelError> {
        if self.width <= 0 || self.height <= 0 || self.x < 0 || self.y < 0 || self.z < 0
            || self.t < 0
        {
            return Err(PixelError::InvalidBlock {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Resolve the level index against a pyramid of `levels` levels.
    ///
    /// Negative indices count from the end: `-1` resolves to the last level,
    /// `-levels` to level 0.
    pub fn resolve_level(&self, levels: usize) -> Result<usize, PixelError> {
        let resolved = if self.level < 0 {
            self.level + levels as i32
        } else {
            self.level
        };
        if resolved < 0 || resolved as usize >= levels {
            return Err(PixelError::InvalidLevel {
                level: self.level,
                levels,
            });
        }
        Ok(resolved as usize)
    }
}

// =============================================================================
// Resizing
// =============================================================================

/// How to resample a block whose decoded shape differs from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMethod {
    /// Nearest-neighbor sampling.
    #[default]
    Nearest,

    /// Bilinear interpolation with edge clamping.
    Bilinear,
}

/// Sample value conversion used by the resampling kernels.
trait Sample: Copy {
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_int_sample {
    ($($ty:ty),*) => {
        $(impl Sample for $ty {
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v.round().clamp(<$ty>::MIN as f64, <$ty>::MAX as f64) as $ty
            }
        })*
    };
}

impl_int_sample!(u8, u16, u32, i8, i16, i32);

impl Sample for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Sample for f64 {
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
}

fn resize_plane<T: Sample>(
    src: &[T],
    (src_w, src_h): (usize, usize),
    (dst_w, dst_h): (usize, usize),
    channels: usize,
    method: ResizeMethod,
) -> Vec<T> {
    match method {
        ResizeMethod::Nearest => resize_nearest(src, (src_w, src_h), (dst_w, dst_h), channels),
        ResizeMethod::Bilinear => resize_bilinear(src, (src_w, src_h), (dst_w, dst_h), channels),
    }
}

fn resize_nearest<T: Copy>(
    src: &[T],
    (src_w, src_h): (usize, usize),
    (dst_w, dst_h): (usize, usize),
    channels: usize,
) -> Vec<T> {
    let mut out = Vec::with_capacity(dst_w * dst_h * channels);
    for y in 0..dst_h {
        let sy = ((y as f64 + 0.5) * src_h as f64 / dst_h as f64) as usize;
        let sy = sy.min(src_h - 1);
        for x in 0..dst_w {
            let sx = ((x as f64 + 0.5) * src_w as f64 / dst_w as f64) as usize;
            let sx = sx.min(src_w - 1);
            let base = (sy * src_w + sx) * channels;
            out.extend_from_slice(&src[base..base + channels]);
        }
    }
    out
}

fn resize_bilinear<T: Sample>(
    src: &[T],
    (src_w, src_h): (usize, usize),
    (dst_w, dst_h): (usize, usize),
    channels: usize,
) -> Vec<T> {
    let mut out = Vec::with_capacity(dst_w * dst_h * channels);
    let x_ratio = src_w as f64 / dst_w as f64;
    let y_ratio = src_h as f64 / dst_h as f64;
    for y in 0..dst_h {
        let sy = ((y as f64 + 0.5) * y_ratio - 0.5).clamp(0.0, (src_h - 1) as f64);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f64;
        for x in 0..dst_w {
            let sx = ((x as f64 + 0.5) * x_ratio - 0.5).clamp(0.0, (src_w - 1) as f64);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f64;
            for c in 0..channels {
                let p00 = src[(y0 * src_w + x0) * channels + c].to_f64();
                let p01 = src[(y0 * src_w + x1) * channels + c].to_f64();
                let p10 = src[(y1 * src_w + x0) * channels + c].to_f64();
                let p11 = src[(y1 * src_w + x1) * channels + c].to_f64();
                let top = p00 + (p01 - p00) * fx;
                let bottom = p10 + (p11 - p10) * fx;
                out.push(T::from_f64(top + (bottom - top) * fy));
            }
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
