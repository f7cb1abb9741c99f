//! Glyph atlas cache
//!
//! Maps (font, size, glyph, subpixel phase) keys to atlas rectangles.
//! Misses rasterize through the font's `GlyphSource`, pack via the
//! shelf packer, and write pixels into the shared coverage buffer.
//! When the packer reports full, the cache clears the whole atlas,
//! bumps the generation counter, and re-admits the glyph that
//! triggered the reset; previously issued rectangles become stale and
//! callers re-resolve them lazily.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::atlas::{Atlas, DirtyRect, PackedRect, ShelfPacker};
use crate::config::AtlasConfig;
use crate::error::{AtlasError, FontError};
use crate::font::{
    FallbackChain, FontId, FontStore, GlyphSource, LineMetrics, RasterizedGlyph, SubpixelPhase,
    VectorFont, NOTDEF,
};

/// Pixel sizes are bucketed to quarter-pixel steps so repeated
/// requests at "the same" size hit the cache without comparing floats.
const SIZE_QUANT: f32 = 4.0;

fn quantize_size(px: f32) -> u16 {
    // NaN/infinite sizes normalize to the smallest bucket instead of
    // casting to a zero-size rasterization
    if !px.is_finite() {
        return 1;
    }
    (px * SIZE_QUANT).round().clamp(1.0, f32::from(u16::MAX)) as u16
}

/// Atlas lookup key. Exact equality and hashing; no floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub font: FontId,
    pub glyph_id: u16,
    /// Quarter-pixel quantized size bucket
    pub size: u16,
    /// Horizontal subpixel phase (0..=2); 0 unless subpixel
    /// positioning is enabled
    pub phase: u8,
}

/// One cached glyph: atlas rectangle plus placement metrics.
///
/// The rectangle is valid only while [`GlyphCache::generation`] equals
/// `generation`; after a bump the caller re-resolves the glyph.
/// Zero-area glyphs (space) have `width == height == 0` and carry only
/// metrics.
#[derive(Debug, Clone, Copy)]
pub struct GlyphSlot {
    /// Position in the atlas, pixels
    pub x: u32,
    pub y: u32,
    /// Bitmap extent in atlas pixels (oversampled when configured)
    pub width: u32,
    pub height: u32,
    /// Pen position to bitmap left edge, logical pixels
    pub bearing_x: f32,
    /// Baseline to bitmap bottom edge, logical pixels
    pub bearing_y: f32,
    /// Advance to the next pen position, logical pixels
    pub advance: f32,
    /// Atlas generation this rectangle was issued for
    pub generation: u64,
}

/// Measured extents of a codepoint sequence
#[derive(Debug, Clone, Default)]
pub struct TextMetrics {
    /// Sum of advances including kerning
    pub width: f32,
    /// Line height of the primary font (ascent - descent)
    pub height: f32,
    /// Per-glyph advances, kerning folded into the glyph it precedes
    pub advances: Vec<f32>,
}

/// Dynamic glyph rasterization cache over one packed texture atlas
pub struct GlyphCache {
    config: AtlasConfig,
    fonts: FontStore,
    fallback: FallbackChain,
    atlas: Atlas,
    packer: ShelfPacker,
    index: HashMap<GlyphKey, GlyphSlot>,
    /// Memoized character resolution: avoids re-scanning the fallback
    /// chain for characters already probed. Survives atlas resets;
    /// invalidated by font release and chain mutation.
    resolved: HashMap<(FontId, char), (FontId, u16)>,
}

impl GlyphCache {
    pub fn new(config: AtlasConfig) -> Self {
        let config = config.validated();
        info!("Glyph atlas created: {}x{}", config.width, config.height);
        Self {
            atlas: Atlas::new(config.width, config.height),
            packer: ShelfPacker::new(config.width, config.height),
            fonts: FontStore::new(),
            fallback: FallbackChain::new(),
            index: HashMap::new(),
            resolved: HashMap::new(),
            config,
        }
    }

    // ----- Font registration -----

    /// Register a font from raw TTF/OTF bytes
    pub fn register_font_bytes(&mut self, data: &[u8]) -> Result<FontId, FontError> {
        let font = VectorFont::from_bytes(data, self.config.oversample)?;
        Ok(self.register_font(Arc::new(font)))
    }

    /// Register any rasterizer implementation
    pub fn register_font(&mut self, font: Arc<dyn GlyphSource>) -> FontId {
        self.fonts.register(font)
    }

    /// Release a font. All cached entries and resolutions referencing
    /// it are dropped and any fallback-chain reference removed; the
    /// handle becomes invalid.
    pub fn release_font(&mut self, id: FontId) {
        if self.fonts.release(id) {
            self.index.retain(|k, _| k.font != id);
            self.resolved
                .retain(|&(req, _), &mut (owner, _)| req != id && owner != id);
            self.fallback.remove(id);
        }
    }

    // ----- Fallback chain -----

    /// Fonts probed after the primary, in order
    pub fn fallback_chain(&self) -> &FallbackChain {
        &self.fallback
    }

    /// Append a fallback font
    pub fn push_fallback(&mut self, font: FontId) {
        self.fallback.push(font);
        self.resolved.clear();
    }

    /// Remove a fallback font
    pub fn remove_fallback(&mut self, font: FontId) -> bool {
        self.resolved.clear();
        self.fallback.remove(font)
    }

    /// Move a fallback font to a new position in the chain
    pub fn reorder_fallback(&mut self, font: FontId, index: usize) -> bool {
        self.resolved.clear();
        self.fallback.reorder(font, index)
    }

    // ----- Lookup -----

    /// Look up (and cache) the glyph for a character
    pub fn glyph(&mut self, font: FontId, ch: char, px: f32) -> Result<GlyphSlot, AtlasError> {
        self.glyph_at(font, ch, px, 0.0)
    }

    /// Look up with an explicit pen x position; with subpixel
    /// positioning enabled, the fractional part selects a 1/3 px
    /// phase variant
    pub fn glyph_at(
        &mut self,
        font: FontId,
        ch: char,
        px: f32,
        pen_x: f32,
    ) -> Result<GlyphSlot, AtlasError> {
        if self.fonts.get(font).is_none() {
            return Err(AtlasError::UnknownFont(font));
        }
        self.lookup_char(font, ch, px, self.phase_for(pen_x))
    }

    /// Look up by explicit glyph index (e.g. from shaping results),
    /// bypassing character resolution and the fallback chain
    pub fn glyph_indexed(
        &mut self,
        font: FontId,
        glyph_id: u16,
        px: f32,
    ) -> Result<GlyphSlot, AtlasError> {
        self.lookup(font, glyph_id, px, 0)
    }

    /// Character-driven lookup: probe the primary font, then the
    /// fallback chain in order. A font whose outline fails to
    /// rasterize is treated the same as one missing the glyph and the
    /// probe continues; when no font renders the character, the
    /// *primary* font's `.notdef` stands in. The winning resolution is
    /// memoized under the original `(font, ch)` key so the scan runs
    /// once.
    fn lookup_char(
        &mut self,
        primary: FontId,
        ch: char,
        px: f32,
        phase: u8,
    ) -> Result<GlyphSlot, AtlasError> {
        if let Some(&(owner, glyph_id)) = self.resolved.get(&(primary, ch)) {
            return self.lookup(owner, glyph_id, px, phase);
        }

        let mut probes = Vec::with_capacity(1 + self.fallback.fonts().len());
        probes.push(primary);
        probes.extend(
            self.fallback
                .fonts()
                .iter()
                .copied()
                .filter(|&f| f != primary),
        );

        for id in probes {
            let glyph_id = match self.fonts.get(id) {
                Some(font) => font.glyph_index(ch),
                None => continue,
            };
            if glyph_id == NOTDEF {
                continue;
            }
            if let Some(slot) = self.try_lookup(id, glyph_id, px, phase)? {
                self.resolved.insert((primary, ch), (id, glyph_id));
                return Ok(slot);
            }
        }

        debug!("Glyph not found in any font: U+{:04X}", ch as u32);
        self.resolved.insert((primary, ch), (primary, NOTDEF));
        self.lookup(primary, NOTDEF, px, phase)
    }

    fn phase_for(&self, pen_x: f32) -> u8 {
        if self.config.subpixel {
            SubpixelPhase::from_frac(pen_x - pen_x.floor()).index()
        } else {
            0
        }
    }

    /// Lookup with `.notdef` degradation for glyphs the font cannot
    /// render; used for explicit-index requests and memoized
    /// resolutions
    fn lookup(
        &mut self,
        font: FontId,
        glyph_id: u16,
        px: f32,
        phase: u8,
    ) -> Result<GlyphSlot, AtlasError> {
        if let Some(slot) = self.try_lookup(font, glyph_id, px, phase)? {
            return Ok(slot);
        }

        let size = quantize_size(px);
        let notdef = if glyph_id != NOTDEF {
            self.try_lookup(font, NOTDEF, px, phase)?
        } else {
            None
        };
        let slot = match notdef {
            Some(slot) => slot,
            // Even .notdef failed: an invisible zero-advance entry
            None => self.admit(
                GlyphKey {
                    font,
                    glyph_id: NOTDEF,
                    size,
                    phase,
                },
                &RasterizedGlyph::empty(0.0),
            )?,
        };

        // Recorded under the failing key so the failure is not retried
        self.index.insert(
            GlyphKey {
                font,
                glyph_id,
                size,
                phase,
            },
            slot,
        );
        Ok(slot)
    }

    /// Cache hit or rasterize-and-admit for one key. `Ok(None)` means
    /// the font could not produce the glyph (missing index, corrupt
    /// outline, or a bogus coverage buffer); the caller decides what
    /// stands in.
    fn try_lookup(
        &mut self,
        font: FontId,
        glyph_id: u16,
        px: f32,
        phase: u8,
    ) -> Result<Option<GlyphSlot>, AtlasError> {
        let size = quantize_size(px);
        let key = GlyphKey {
            font,
            glyph_id,
            size,
            phase,
        };

        if let Some(slot) = self.index.get(&key) {
            // Entries from earlier generations are stale; re-admit
            if slot.generation == self.atlas.generation() {
                return Ok(Some(*slot));
            }
        }

        let source = self
            .fonts
            .get(font)
            .cloned()
            .ok_or(AtlasError::UnknownFont(font))?;

        // Rasterize at the bucket-representative size so every request
        // in the bucket produces the identical bitmap
        let px_q = f32::from(size) / SIZE_QUANT;
        let offset_x = SubpixelPhase::from_index(phase).offset();
        match source.rasterize(glyph_id, px_q, offset_x) {
            Ok(glyph) => {
                // Distrust third-party sources: a short coverage
                // buffer is a raster failure, not a cache panic
                if glyph.coverage.len() != glyph.width as usize * glyph.height as usize {
                    warn!(
                        "Treating glyph {} as missing: coverage buffer {} bytes for {}x{} bitmap",
                        glyph_id,
                        glyph.coverage.len(),
                        glyph.width,
                        glyph.height
                    );
                    return Ok(None);
                }
                self.admit(key, &glyph).map(Some)
            }
            Err(e) => {
                warn!("Treating glyph as missing: {}", e);
                Ok(None)
            }
        }
    }

    /// Place a rasterized bitmap into the atlas and record the entry
    fn admit(&mut self, key: GlyphKey, glyph: &RasterizedGlyph) -> Result<GlyphSlot, AtlasError> {
        // Zero-area glyphs carry metrics only, no packer allocation
        if glyph.is_empty() {
            let slot = GlyphSlot {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                bearing_x: glyph.bearing_x,
                bearing_y: glyph.bearing_y,
                advance: glyph.advance,
                generation: self.atlas.generation(),
            };
            self.index.insert(key, slot);
            return Ok(slot);
        }

        let pad = self.config.padding;
        let padded_w = glyph.width + 2 * pad;
        let padded_h = glyph.height + 2 * pad;

        // Never reset for a glyph that cannot fit an empty atlas
        if !self.packer.fits(padded_w, padded_h) {
            return Err(self.too_large(key.glyph_id, glyph));
        }

        let rect = match self.packer.allocate(padded_w, padded_h) {
            Some(r) => r,
            None => {
                self.reset();
                // Post-reset the packer is empty, so this succeeds for
                // any glyph that passed the fits() check
                match self.packer.allocate(padded_w, padded_h) {
                    Some(r) => r,
                    None => return Err(self.too_large(key.glyph_id, glyph)),
                }
            }
        };

        let inner = PackedRect {
            x: rect.x + pad,
            y: rect.y + pad,
            width: glyph.width,
            height: glyph.height,
        };
        self.atlas.blit(inner, &glyph.coverage);

        let slot = GlyphSlot {
            x: inner.x,
            y: inner.y,
            width: inner.width,
            height: inner.height,
            bearing_x: glyph.bearing_x,
            bearing_y: glyph.bearing_y,
            advance: glyph.advance,
            generation: self.atlas.generation(),
        };
        self.index.insert(key, slot);
        Ok(slot)
    }

    fn too_large(&self, glyph_id: u16, glyph: &RasterizedGlyph) -> AtlasError {
        AtlasError::GlyphTooLarge {
            glyph_id,
            width: glyph.width,
            height: glyph.height,
            atlas_width: self.atlas.width(),
            atlas_height: self.atlas.height(),
        }
    }

    /// Clear-and-rebuild eviction: wipe pixels, discard the index,
    /// free all packer space, advance the generation. Re-rasterization
    /// of previously cached glyphs is paid lazily on their next lookup.
    fn reset(&mut self) {
        warn!(
            "Atlas full: clearing {} glyphs, advancing to generation {}",
            self.index.len(),
            self.atlas.generation() + 1
        );
        self.index.clear();
        self.packer.reset();
        self.atlas.clear_and_advance();
    }

    // ----- Measurement -----

    /// Measure a codepoint sequence: total advance width, primary-font
    /// line height, and per-glyph advances. Kerning is consulted per
    /// adjacent pair when both glyphs resolved from the same font; a
    /// missing kerning value is a zero offset, not an error.
    pub fn measure(
        &mut self,
        font: FontId,
        text: &str,
        px: f32,
    ) -> Result<TextMetrics, AtlasError> {
        if text.is_empty() {
            return Ok(TextMetrics::default());
        }

        let source = self
            .fonts
            .get(font)
            .cloned()
            .ok_or(AtlasError::UnknownFont(font))?;
        let px_q = f32::from(quantize_size(px)) / SIZE_QUANT;
        let lm = source.line_metrics(px_q);

        let mut advances = Vec::new();
        let mut width = 0.0f32;
        let mut prev: Option<(FontId, u16)> = None;

        for ch in text.chars() {
            let slot = self.lookup_char(font, ch, px, 0)?;
            // lookup_char memoized the resolution for this character
            let (owner, glyph_id) = self
                .resolved
                .get(&(font, ch))
                .copied()
                .unwrap_or((font, NOTDEF));

            let mut advance = slot.advance;
            if let Some((prev_font, prev_id)) = prev {
                if prev_font == owner {
                    if let Some(f) = self.fonts.get(owner) {
                        advance += f.kern(prev_id, glyph_id, px_q);
                    }
                }
            }

            width += advance;
            advances.push(advance);
            prev = Some((owner, glyph_id));
        }

        Ok(TextMetrics {
            width,
            height: lm.ascent - lm.descent,
            advances,
        })
    }

    /// Vertical metrics of a registered font at a pixel size
    pub fn line_metrics(&self, font: FontId, px: f32) -> Result<LineMetrics, AtlasError> {
        let source = self.fonts.get(font).ok_or(AtlasError::UnknownFont(font))?;
        Ok(source.line_metrics(f32::from(quantize_size(px)) / SIZE_QUANT))
    }

    // ----- Atlas access (render consumer) -----

    /// Atlas dimensions in pixels
    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas.width(), self.atlas.height())
    }

    /// The full coverage buffer, row-major, one byte per pixel
    pub fn pixels(&self) -> &[u8] {
        self.atlas.pixels()
    }

    /// Current packing epoch. When this changes, every previously
    /// issued [`GlyphSlot`] is stale and must be re-resolved.
    pub fn generation(&self) -> u64 {
        self.atlas.generation()
    }

    /// Region written since the last `take_dirty()`
    pub fn dirty(&self) -> Option<DirtyRect> {
        self.atlas.dirty()
    }

    /// Snapshot-and-clear of the dirty region for texture upload
    pub fn take_dirty(&mut self) -> Option<DirtyRect> {
        self.atlas.take_dirty()
    }
}
