//! Font handles and the rasterizer boundary
//!
//! Handles:
//! - Registration/release of parsed fonts with shared ownership
//! - The `GlyphSource` trait the atlas cache rasterizes through
//! - TTF/OTF loading via fontdue (`raster`)
//! - Fallback font chains (`fallback`)

pub mod fallback;
pub mod raster;

pub use fallback::FallbackChain;
pub use raster::{load_system_font, RasterizedGlyph, SubpixelPhase, VectorFont};

use std::sync::Arc;

use crate::error::RasterError;

/// Glyph index reserved for `.notdef` (missing glyph)
pub const NOTDEF: u16 = 0;

/// Opaque handle to a font registered with a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) u32);

/// Vertical metrics at a given pixel size
#[derive(Debug, Clone, Copy)]
pub struct LineMetrics {
    /// Baseline to top of tallest glyph
    pub ascent: f32,
    /// Baseline to bottom of lowest glyph (negative, below baseline)
    pub descent: f32,
    /// Recommended baseline-to-baseline distance
    pub line_height: f32,
}

/// Rasterizer boundary: everything the atlas cache needs from a font.
///
/// The production implementation is [`VectorFont`] over fontdue;
/// tests substitute synthetic sources. Implementations are pure with
/// respect to cache state: rasterization has no side effects beyond
/// producing a buffer.
pub trait GlyphSource {
    /// Glyph index for a character; [`NOTDEF`] when the font has no mapping
    fn glyph_index(&self, ch: char) -> u16;

    /// Rasterize a glyph to an 8-bit coverage bitmap at a pixel size.
    ///
    /// `offset_x` is a horizontal subpixel offset in pixels (0.0..1.0)
    /// the outline is translated right by before sampling, so each
    /// phase variant yields genuinely different coverage.
    ///
    /// Zero-area glyphs (space) return an empty bitmap with a valid
    /// advance; the cache allocates no atlas space for them.
    fn rasterize(&self, glyph_id: u16, px: f32, offset_x: f32)
        -> Result<RasterizedGlyph, RasterError>;

    /// Vertical metrics at a pixel size
    fn line_metrics(&self, px: f32) -> LineMetrics;

    /// Kerning adjustment between two glyphs in pixels, zero when the
    /// font has no kerning value for the pair
    fn kern(&self, left: u16, right: u16, px: f32) -> f32 {
        let _ = (left, right, px);
        0.0
    }
}

/// Slot-based store of registered fonts.
///
/// Fonts are `Arc`-shared so multiple caches may hold the same parsed
/// font; release drops this store's reference and frees the slot for
/// reuse.
pub(crate) struct FontStore {
    slots: Vec<Option<Arc<dyn GlyphSource>>>,
}

impl FontStore {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn register(&mut self, font: Arc<dyn GlyphSource>) -> FontId {
        if let Some(idx) = self.slots.iter().position(Option::is_none) {
            self.slots[idx] = Some(font);
            return FontId(idx as u32);
        }
        self.slots.push(Some(font));
        FontId((self.slots.len() - 1) as u32)
    }

    /// Returns false when the handle was not registered
    pub(crate) fn release(&mut self, id: FontId) -> bool {
        match self.slots.get_mut(id.0 as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&Arc<dyn GlyphSource>> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }
}
