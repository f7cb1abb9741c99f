//! Error types
//!
//! Only unrecoverable conditions surface to the caller: bad font data
//! at registration, or a glyph too large to ever fit the atlas.
//! Missing glyphs and atlas exhaustion are resolved internally via
//! fallback probing and the clear-and-rebuild reset.

use thiserror::Error;

use crate::font::FontId;

/// Font registration failure.
///
/// Fatal for that font only; other registered fonts are unaffected.
#[derive(Debug, Error)]
pub enum FontError {
    /// Malformed or truncated font data
    #[error("failed to parse font data: {0}")]
    Parse(String),
    /// No usable system font on this machine
    #[error("no system font found in any known location")]
    NotFound,
}

/// Rasterization failure for a single glyph.
///
/// Never returned from the cache: a failed glyph degrades to the
/// owning font's `.notdef` after logging.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Font has no outline or bitmap for this index
    #[error("glyph {glyph_id} not present in font")]
    GlyphNotFound { glyph_id: u16 },
    /// Outline data exists but could not be rendered
    #[error("failed to rasterize glyph {glyph_id}: {reason}")]
    RasterizeFailed { glyph_id: u16, reason: String },
}

/// Cache lookup failure surfaced to the caller
#[derive(Debug, Error)]
pub enum AtlasError {
    /// Glyph bitmap exceeds the atlas dimensions even when empty.
    /// Never retried; the caller decides on a substitute.
    #[error(
        "glyph {glyph_id} ({width}x{height}) exceeds atlas dimensions {atlas_width}x{atlas_height}"
    )]
    GlyphTooLarge {
        glyph_id: u16,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },
    /// Font handle is not registered or was already released
    #[error("font {0:?} is not registered")]
    UnknownFont(FontId),
}

/// Static image decoding failure
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed or unsupported image byte stream
    #[error("failed to decode image: {0}")]
    Malformed(#[from] image::ImageError),
}
