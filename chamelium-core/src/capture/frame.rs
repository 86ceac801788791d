//! Raw frame to image-file conversion.
//!
//! The board returns captured frames as packed 8-bit RGB, row-major,
//! `width * height * 3` bytes.  Encoding is done by the [`image`] crate; the
//! output format follows the destination's file extension.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::errors::ChameliumError;

/// Bytes per pixel in a captured frame.
pub const BYTES_PER_PIXEL: usize = 3;

/// Pick the encoding for `path`: PNG, BMP or JPEG by extension, PNG otherwise.
pub fn format_for_path(path: Option<&Path>) -> ImageFormat {
    match path.and_then(|p| ImageFormat::from_path(p).ok()) {
        Some(fmt @ (ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Jpeg)) => fmt,
        _ => ImageFormat::Png,
    }
}

/// Encode one raw RGB frame.
pub fn encode_frame(
    raw: Vec<u8>,
    width: u32,
    height: u32,
    format: ImageFormat,
) -> Result<Vec<u8>, ChameliumError> {
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if raw.len() != expected {
        return Err(ChameliumError::Conversion(format!(
            "frame is {} bytes, expected {expected} for {width}x{height} RGB",
            raw.len()
        )));
    }

    let img = RgbImage::from_raw(width, height, raw).ok_or_else(|| {
        ChameliumError::Conversion("RgbImage::from_raw failed: buffer size mismatch".into())
    })?;

    let mut buf: Vec<u8> = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| ChameliumError::Conversion(format!("{format:?} encoding failed: {e}")))?;

    Ok(buf)
}
