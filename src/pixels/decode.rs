//! Decoding of encoded pixel payloads.
//!
//! All three transport strategies deliver the same "ImageJ TIFF" interchange
//! encoding; they differ only in how the bytes arrive (temp file, raw bytes,
//! base64 text). Two decoders cover the payloads:
//!
//! - packed RGB images go through the `image` crate's 2D decoder
//! - everything else goes through the `tiff` crate, reading one plane per
//!   TIFF directory and reordering so channel becomes the last axis

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use image::DynamicImage;
use tiff::decoder::{Decoder, DecodingResult};

use crate::error::PixelError;

use super::block::{PixelBlock, Samples};

/// Decode an in-memory payload.
pub(crate) fn decode_payload(bytes: &[u8], is_rgb: bool) -> Result<PixelBlock, PixelError> {
    if is_rgb {
        decode_rgb(bytes)
    } else {
        decode_planes(Cursor::new(bytes))
    }
}

/// Decode a payload the remote side wrote to a local file.
pub(crate) fn decode_path(path: &Path, is_rgb: bool) -> Result<PixelBlock, PixelError> {
    if is_rgb {
        decode_rgb(&std::fs::read(path)?)
    } else {
        decode_planes(BufReader::new(File::open(path)?))
    }
}

// =============================================================================
// RGB Decoding
// =============================================================================

/// Decode a packed RGB (or grayscale) 2D image via the `image` crate.
fn decode_rgb(bytes: &[u8]) -> Result<PixelBlock, PixelError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageRgb8(buf) => {
            PixelBlock::new(width, height, 3, Samples::U8(buf.into_raw()))
        }
        DynamicImage::ImageRgba8(buf) => {
            // Alpha is never meaningful in this interchange; drop it.
            let rgb = DynamicImage::ImageRgba8(buf).to_rgb8();
            PixelBlock::new(width, height, 3, Samples::U8(rgb.into_raw()))
        }
        DynamicImage::ImageLuma8(buf) => {
            PixelBlock::new(width, height, 1, Samples::U8(buf.into_raw()))
        }
        DynamicImage::ImageLuma16(buf) => {
            PixelBlock::new(width, height, 1, Samples::U16(buf.into_raw()))
        }
        DynamicImage::ImageRgb16(buf) => {
            PixelBlock::new(width, height, 3, Samples::U16(buf.into_raw()))
        }
        other => {
            let rgb = other.to_rgb8();
            PixelBlock::new(width, height, 3, Samples::U8(rgb.into_raw()))
        }
    }
}

// =============================================================================
// Plane Decoding
// =============================================================================

/// Decode a (possibly multi-plane) TIFF, channels last.
///
/// Each TIFF directory holds one single-channel plane; planes must agree in
/// dimensions and datatype.
fn decode_planes<R: Read + Seek>(reader: R) -> Result<PixelBlock, PixelError> {
    let mut decoder = Decoder::new(reader)?;
    let mut planes: Vec<Samples> = Vec::new();
    let mut dims: Option<(u32, u32)> = None;

    loop {
        let (width, height) = decoder.dimensions()?;
        match dims {
            None => dims = Some((width, height)),
            Some(expected) if expected != (width, height) => {
                return Err(PixelError::Decode(format!(
                    "plane {} is {}x{}, expected {}x{}",
                    planes.len(),
                    width,
                    height,
                    expected.0,
                    expected.1
                )));
            }
            Some(_) => {}
        }

        let plane = samples_from_result(decoder.read_image()?)?;
        let expected = width as usize * height as usize;
        if plane.len() != expected {
            return Err(PixelError::Decode(format!(
                "plane {} has {} sample(s), expected a single-channel {}x{} plane",
                planes.len(),
                plane.len(),
                width,
                height
            )));
        }
        planes.push(plane);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let (width, height) =
        dims.ok_or_else(|| PixelError::Decode("payload contains no planes".to_string()))?;
    let channels = planes.len() as u32;
    if channels == 1 {
        let samples = planes.swap_remove(0);
        return PixelBlock::new(width, height, 1, samples);
    }
    let samples = interleave(planes, width as usize * height as usize)?;
    PixelBlock::new(width, height, channels, samples)
}

fn samples_from_result(result: DecodingResult) -> Result<Samples, PixelError> {
    match result {
        DecodingResult::U8(v) => Ok(Samples::U8(v)),
        DecodingResult::U16(v) => Ok(Samples::U16(v)),
        DecodingResult::U32(v) => Ok(Samples::U32(v)),
        DecodingResult::I8(v) => Ok(Samples::I8(v)),
        DecodingResult::I16(v) => Ok(Samples::I16(v)),
        DecodingResult::I32(v) => Ok(Samples::I32(v)),
        DecodingResult::F32(v) => Ok(Samples::F32(v)),
        DecodingResult::F64(v) => Ok(Samples::F64(v)),
        _ => Err(PixelError::Decode(
            "unsupported TIFF sample representation".to_string(),
        )),
    }
}

/// Reorder channel-first planes into one channels-last buffer.
fn interleave(planes: Vec<Samples>, plane_len: usize) -> Result<Samples, PixelError> {
    macro_rules! interleave_as {
        ($variant:ident) => {{
            let mut typed = Vec::with_capacity(planes.len());
            for plane in planes {
                match plane {
                    Samples::$variant(v) => typed.push(v),
                    other => {
                        return Err(PixelError::Decode(format!(
                            "mixed plane datatypes ({} plane in a {} stack)",
                            other.data_type().name(),
                            stringify!($variant),
                        )))
                    }
                }
            }
            let channels = typed.len();
            let mut out = Vec::with_capacity(plane_len * channels);
            for i in 0..plane_len {
                for plane in &typed {
                    out.push(plane[i]);
                }
            }
            Samples::$variant(out)
        }};
    }

    Ok(match planes.first() {
        Some(Samples::U8(_)) => interleave_as!(U8),
        Some(Samples::U16(_)) => interleave_as!(U16),
        Some(Samples::U32(_)) => interleave_as!(U32),
        Some(Samples::I8(_)) => interleave_as!(I8),
        Some(Samples::I16(_)) => interleave_as!(I16),
        Some(Samples::I32(_)) => interleave_as!(I32),
        Some(Samples::F32(_)) => interleave_as!(F32),
        Some(Samples::F64(_)) => interleave_as!(F64),
        None => return Err(PixelError::Decode("payload contains no planes".to_string())),
    })
}

// =============================================================================
// Tests
// =============================================================================
