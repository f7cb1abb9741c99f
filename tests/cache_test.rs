//! Public-API tests with synthetic rasterizers
//!
//! Uses counting fake `GlyphSource` implementations so the cache's
//! behavior (idempotence, generation bumps, packing, fallback order)
//! is observable without real font files.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glyphstash::{
    AtlasConfig, AtlasError, GlyphCache, GlyphSlot, GlyphSource, LineMetrics, RasterError,
    RasterizedGlyph, NOTDEF,
};

/// Fake font: each mapped character rasterizes to a solid square whose
/// side grows with the glyph index; counts rasterize calls.
struct SquareFont {
    base_side: u32,
    chars: Vec<char>,
    calls: AtomicUsize,
}

impl SquareFont {
    fn new(base_side: u32, chars: &str) -> Arc<Self> {
        Arc::new(Self {
            base_side,
            chars: chars.chars().collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl GlyphSource for SquareFont {
    fn glyph_index(&self, ch: char) -> u16 {
        self.chars
            .iter()
            .position(|&c| c == ch)
            .map(|i| i as u16 + 1)
            .unwrap_or(NOTDEF)
    }

    fn rasterize(
        &self,
        glyph_id: u16,
        px: f32,
        _offset_x: f32,
    ) -> Result<RasterizedGlyph, RasterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        // Space rasterizes to a zero-area bitmap with a valid advance
        if glyph_id != NOTDEF && self.chars.get(glyph_id as usize - 1) == Some(&' ') {
            return Ok(RasterizedGlyph::empty(px * 0.5));
        }

        let side = if glyph_id == NOTDEF {
            (self.base_side / 2).max(1)
        } else {
            self.base_side + u32::from(glyph_id % 4)
        };
        Ok(RasterizedGlyph {
            width: side,
            height: side,
            bearing_x: 0.0,
            bearing_y: 0.0,
            advance: px * 0.5,
            coverage: vec![0xFF; (side * side) as usize],
        })
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 0.75,
            descent: -px * 0.25,
            line_height: px,
        }
    }

    fn kern(&self, left: u16, right: u16, _px: f32) -> f32 {
        // One fixed kerning pair: glyphs 1 and 2
        if left == 1 && right == 2 {
            -1.5
        } else {
            0.0
        }
    }
}

fn cache(width: u32, height: u32) -> GlyphCache {
    GlyphCache::new(AtlasConfig {
        width,
        height,
        padding: 1,
        ..Default::default()
    })
}

fn rects_overlap(a: &GlyphSlot, b: &GlyphSlot) -> bool {
    a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
}

#[test]
fn test_repeated_lookup_is_idempotent() {
    let mut cache = cache(256, 256);
    let font = SquareFont::new(12, "abc");
    let id = cache.register_font(font.clone());

    let first = cache.glyph(id, 'a', 14.0).unwrap();
    let second = cache.glyph(id, 'a', 14.0).unwrap();

    // Identical rectangle, no redundant rasterization
    assert_eq!((first.x, first.y, first.width, first.height),
               (second.x, second.y, second.width, second.height));
    assert_eq!(first.generation, second.generation);
    assert_eq!(font.calls(), 1);
}

#[test]
fn test_generation_bumps_once_per_exhaustion() {
    // 'a', 'e', 'i', 'm', 'q' all rasterize to 21x21 squares, padded
    // to 23x23 in a 64x64 atlas: 4 fit, the 5th triggers a reset
    let mut cache = cache(64, 64);
    let font = SquareFont::new(20, "abcdefghijklmnopq");
    let id = cache.register_font(font.clone());

    let mut generations = vec![cache.generation()];
    let before_reset = cache.glyph(id, 'a', 16.0).unwrap();
    for ch in "eimq".chars() {
        cache.glyph(id, ch, 16.0).unwrap();
        generations.push(cache.generation());
    }

    // Exactly one strict increase across the exhaustion event
    assert_eq!(generations, vec![0, 0, 0, 0, 1]);

    // Rectangles issued before the bump are stale; re-lookup issues a
    // validly packed rectangle for the new generation
    assert_eq!(before_reset.generation, 0);
    let after = cache.glyph(id, 'a', 16.0).unwrap();
    assert_eq!(after.generation, 1);
    let (aw, ah) = cache.atlas_size();
    assert!(after.x + after.width <= aw);
    assert!(after.y + after.height <= ah);
}

#[test]
fn test_no_overlap_within_generation() {
    let mut cache = cache(128, 128);
    let font = SquareFont::new(9, "abcdefghijklmnop");
    let id = cache.register_font(font.clone());

    let mut slots: Vec<GlyphSlot> = Vec::new();
    for ch in "abcdefghijklmnop".chars() {
        let slot = cache.glyph(id, ch, 16.0).unwrap();
        assert_eq!(slot.generation, 0, "atlas should not exhaust in this test");
        slots.push(slot);
    }

    for i in 0..slots.len() {
        for j in (i + 1)..slots.len() {
            assert!(
                !rects_overlap(&slots[i], &slots[j]),
                "glyphs {} and {} overlap",
                i,
                j
            );
        }
    }
}

#[test]
fn test_oversized_glyph_never_loops() {
    let mut cache = cache(64, 64);
    let font = SquareFont::new(200, "a");
    let id = cache.register_font(font.clone());

    let gen_before = cache.generation();
    let err = cache.glyph(id, 'a', 16.0).unwrap_err();
    assert!(matches!(err, AtlasError::GlyphTooLarge { .. }));

    // No reset was attempted, and retrying fails the same way
    assert_eq!(cache.generation(), gen_before);
    assert!(cache.glyph(id, 'a', 16.0).is_err());
}

#[test]
fn test_fallback_resolution_order() {
    let mut cache = cache(128, 128);
    let primary = SquareFont::new(10, "x");
    let fallback = SquareFont::new(16, "g");
    let a = cache.register_font(primary.clone());
    let b = cache.register_font(fallback.clone());
    cache.push_fallback(b);

    // A lacks 'g', B has it: B's rasterization is returned
    let slot = cache.glyph(a, 'g', 16.0).unwrap();
    assert_eq!(slot.width, 17); // fallback side 16 + (gid 1 % 4)
    assert_eq!(fallback.calls(), 1);
    assert_eq!(primary.calls(), 0);

    // Neither has 'q': primary's .notdef (half-side box)
    let slot = cache.glyph(a, 'q', 16.0).unwrap();
    assert_eq!(slot.width, 5);
    assert_eq!(primary.calls(), 1);

    // The fallback scan is memoized: repeat lookups touch no font
    cache.glyph(a, 'q', 16.0).unwrap();
    cache.glyph(a, 'g', 16.0).unwrap();
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[test]
fn test_empty_measurement_is_free() {
    let mut cache = cache(128, 128);
    let font = SquareFont::new(10, "abc");
    let id = cache.register_font(font.clone());

    let m = cache.measure(id, "", 16.0).unwrap();
    assert_eq!(m.width, 0.0);
    assert_eq!(m.height, 0.0);
    assert!(m.advances.is_empty());
    assert_eq!(font.calls(), 0);
}

#[test]
fn test_measurement_accumulates_advances_and_kerning() {
    let mut cache = cache(256, 256);
    let font = SquareFont::new(10, "abc");
    let id = cache.register_font(font.clone());

    let m = cache.measure(id, "abc", 16.0).unwrap();
    assert_eq!(m.advances.len(), 3);

    // Advance is px * 0.5 per glyph; the (a, b) pair kerns by -1.5
    let expected = 16.0 * 0.5 * 3.0 - 1.5;
    assert!((m.width - expected).abs() < 1e-4);
    assert!((m.advances[1] - (8.0 - 1.5)).abs() < 1e-4);
    assert!((m.height - 16.0).abs() < 1e-4);
}

#[test]
fn test_zero_area_glyph_takes_no_atlas_space() {
    let mut cache = cache(128, 128);
    // ' ' maps past the glyph range, which SquareFont rasterizes empty
    let font = SquareFont::new(10, "ab ");
    let id = cache.register_font(font.clone());

    let slot = cache.glyph(id, ' ', 16.0).unwrap();
    assert_eq!((slot.width, slot.height), (0, 0));
    assert!(slot.advance > 0.0);

    // Nothing was written, so nothing is dirty
    assert!(cache.dirty().is_none());
}

#[test]
fn test_dirty_region_covers_written_glyphs() {
    let mut cache = cache(128, 128);
    let font = SquareFont::new(10, "ab");
    let id = cache.register_font(font.clone());

    let a = cache.glyph(id, 'a', 16.0).unwrap();
    let dirty = cache.take_dirty().unwrap();
    assert!(dirty.x0 <= a.x && dirty.y0 <= a.y);
    assert!(dirty.x1 >= a.x + a.width && dirty.y1 >= a.y + a.height);

    // Pixels were actually written at the issued rectangle
    let (aw, _) = cache.atlas_size();
    let idx = (a.y * aw + a.x) as usize;
    assert_eq!(cache.pixels()[idx], 0xFF);

    // Snapshot-and-clear semantics
    assert!(cache.take_dirty().is_none());
    cache.glyph(id, 'b', 16.0).unwrap();
    assert!(cache.take_dirty().is_some());
}

/// Fake font that maps its characters but fails to rasterize every
/// glyph except `.notdef`, which renders as a box of the given side
struct BrokenOutlines {
    notdef_side: u32,
    chars: Vec<char>,
}

impl BrokenOutlines {
    fn new(notdef_side: u32, chars: &str) -> Arc<Self> {
        Arc::new(Self {
            notdef_side,
            chars: chars.chars().collect(),
        })
    }
}

impl GlyphSource for BrokenOutlines {
    fn glyph_index(&self, ch: char) -> u16 {
        self.chars
            .iter()
            .position(|&c| c == ch)
            .map(|i| i as u16 + 1)
            .unwrap_or(NOTDEF)
    }

    fn rasterize(
        &self,
        glyph_id: u16,
        px: f32,
        _offset_x: f32,
    ) -> Result<RasterizedGlyph, RasterError> {
        if glyph_id == NOTDEF {
            let side = self.notdef_side;
            return Ok(RasterizedGlyph {
                width: side,
                height: side,
                bearing_x: 0.0,
                bearing_y: 0.0,
                advance: px * 0.5,
                coverage: vec![0xFF; (side * side) as usize],
            });
        }
        Err(RasterError::RasterizeFailed {
            glyph_id,
            reason: "corrupt outline".into(),
        })
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px,
            descent: 0.0,
            line_height: px,
        }
    }
}

#[test]
fn test_rasterize_failure_continues_fallback_probe() {
    let mut cache = cache(128, 128);
    let primary = BrokenOutlines::new(6, "g");
    let fallback = SquareFont::new(16, "g");
    let a = cache.register_font(primary);
    let b = cache.register_font(fallback.clone());
    cache.push_fallback(b);

    // The primary maps 'g' but its outline fails to rasterize; the
    // probe moves on and B's glyph is returned
    let slot = cache.glyph(a, 'g', 16.0).unwrap();
    assert_eq!(slot.width, 17); // fallback side 16 + (gid 1 % 4)

    // The resolution is memoized past the broken font
    cache.glyph(a, 'g', 16.0).unwrap();
    assert_eq!(fallback.calls(), 1);
}

#[test]
fn test_all_fonts_failing_degrades_to_primary_notdef() {
    let mut cache = cache(128, 128);
    let primary = BrokenOutlines::new(6, "g");
    let fallback = BrokenOutlines::new(12, "g");
    let a = cache.register_font(primary);
    let b = cache.register_font(fallback);
    cache.push_fallback(b);

    // Both fonts map 'g' and both fail: the stand-in is the primary
    // font's .notdef, not a mid-chain font's
    let slot = cache.glyph(a, 'g', 16.0).unwrap();
    assert_eq!((slot.width, slot.height), (6, 6));
}

#[test]
fn test_release_font_invalidates_entries() {
    let mut cache = cache(128, 128);
    let keep = cache.register_font(SquareFont::new(10, "a"));
    let drop_ = cache.register_font(SquareFont::new(10, "a"));

    cache.glyph(keep, 'a', 16.0).unwrap();
    cache.glyph(drop_, 'a', 16.0).unwrap();

    cache.release_font(drop_);
    assert!(matches!(
        cache.glyph(drop_, 'a', 16.0),
        Err(AtlasError::UnknownFont(_))
    ));
    // Other fonts are unaffected
    assert!(cache.glyph(keep, 'a', 16.0).is_ok());
}
