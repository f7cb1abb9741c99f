//! Static image decoding
//!
//! Stateless byte-stream decoding for callers packing icon images next
//! to the glyph atlas. No relation to the cache's generation model:
//! decoding the same bytes always yields the same pixels.

use log::debug;

use crate::error::DecodeError;

/// Decoded image: RGBA8 pixels, row-major
#[derive(Debug, Clone)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

/// Decode an encoded image byte stream (PNG or JPEG) into RGBA8
pub fn decode(bytes: &[u8]) -> Result<Pixmap, DecodeError> {
    let img = ::image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    debug!("Image decoded: {}x{}", width, height);

    Ok(Pixmap {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}
