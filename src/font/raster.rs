//! fontdue rasterizer binding
//!
//! Wraps a font-file byte buffer and produces 8-bit coverage bitmaps
//! plus metrics at a requested pixel size. Optionally rasterizes at an
//! oversampled size for quality while reporting logical-size metrics.

use fontdue::{Font, FontSettings};
use log::{debug, info};

use super::{GlyphSource, LineMetrics};
use crate::error::{FontError, RasterError};

/// One rasterized glyph: coverage bitmap plus placement metrics.
///
/// The bitmap is at the rasterized (possibly oversampled) resolution;
/// bearing and advance are in logical pixels.
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    /// Bitmap width in pixels (0 for empty glyphs like space)
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Horizontal offset from pen position to bitmap left edge
    pub bearing_x: f32,
    /// Vertical offset from baseline to bitmap bottom edge
    pub bearing_y: f32,
    /// Horizontal advance to the next pen position
    pub advance: f32,
    /// Row-major 8-bit coverage, `width * height` bytes
    pub coverage: Vec<u8>,
}

impl RasterizedGlyph {
    /// Zero-area glyph carrying only an advance
    pub fn empty(advance: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            bearing_x: 0.0,
            bearing_y: 0.0,
            advance,
            coverage: Vec::new(),
        }
    }

    /// True when the glyph occupies no atlas space
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Subpixel phase (0, 1/3, 2/3 pixel offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubpixelPhase {
    /// 0/3 pixel (integer position)
    Phase0 = 0,
    /// 1/3 pixel
    Phase1 = 1,
    /// 2/3 pixel
    Phase2 = 2,
}

impl SubpixelPhase {
    /// Calculate phase from the fractional part of a pen x position
    /// (range 0.0..1.0); 1/6 boundaries select the nearest phase
    pub fn from_frac(frac: f32) -> Self {
        let phase = ((frac + 1.0 / 6.0) * 3.0) as u32 % 3;
        match phase {
            0 => Self::Phase0,
            1 => Self::Phase1,
            _ => Self::Phase2,
        }
    }

    /// Phase offset (in pixels)
    pub fn offset(self) -> f32 {
        match self {
            Self::Phase0 => 0.0,
            Self::Phase1 => 1.0 / 3.0,
            Self::Phase2 => 2.0 / 3.0,
        }
    }

    /// Bucket index for cache keys
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Phase for a cache-key bucket index
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Phase0,
            1 => Self::Phase1,
            _ => Self::Phase2,
        }
    }
}

/// Shift a coverage bitmap right by `shift` pixels, widening it to
/// hold the spill; fractional shifts blend neighboring columns.
/// Returns the shifted buffer and its new width.
fn shift_coverage(coverage: &[u8], width: usize, height: usize, shift: f32) -> (Vec<u8>, usize) {
    let whole = shift.floor() as usize;
    let frac = shift - shift.floor();
    let out_w = width + whole + usize::from(frac > 0.0);

    let mut out = vec![0u8; out_w * height];
    for y in 0..height {
        for x in 0..out_w {
            let src = x as isize - whole as isize;
            let right = if (0..width as isize).contains(&src) {
                f32::from(coverage[y * width + src as usize])
            } else {
                0.0
            };
            let left = if (1..=width as isize).contains(&src) {
                f32::from(coverage[y * width + src as usize - 1])
            } else {
                0.0
            };
            out[y * out_w + x] = (right * (1.0 - frac) + left * frac).round() as u8;
        }
    }
    (out, out_w)
}

/// Parsed TTF/OTF font backed by fontdue
pub struct VectorFont {
    font: Font,
    /// Rasterize at `px * oversample`, report logical metrics
    oversample: f32,
}

impl VectorFont {
    /// Parse a font from raw file bytes
    pub fn from_bytes(data: &[u8], oversample: f32) -> Result<Self, FontError> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;

        info!("Font loaded: {} glyphs", font.glyph_count());

        Ok(Self {
            font,
            oversample: if oversample.is_finite() { oversample.max(1.0) } else { 1.0 },
        })
    }
}

impl GlyphSource for VectorFont {
    fn glyph_index(&self, ch: char) -> u16 {
        self.font.lookup_glyph_index(ch)
    }

    fn rasterize(
        &self,
        glyph_id: u16,
        px: f32,
        offset_x: f32,
    ) -> Result<RasterizedGlyph, RasterError> {
        if glyph_id >= self.font.glyph_count() {
            return Err(RasterError::GlyphNotFound { glyph_id });
        }

        let scale = self.oversample;
        let (metrics, coverage) = self.font.rasterize_indexed(glyph_id, px * scale);

        if coverage.len() != metrics.width * metrics.height {
            return Err(RasterError::RasterizeFailed {
                glyph_id,
                reason: format!(
                    "coverage buffer {} bytes for {}x{} bitmap",
                    coverage.len(),
                    metrics.width,
                    metrics.height
                ),
            });
        }

        // Translate by the subpixel offset (rasterized-pixel space) so
        // phase variants carry distinct coverage
        let shift = offset_x.max(0.0) * scale;
        let (coverage, width) = if shift > 0.0 && metrics.width > 0 && metrics.height > 0 {
            shift_coverage(&coverage, metrics.width, metrics.height, shift)
        } else {
            (coverage, metrics.width)
        };

        // Bitmap stays at rasterized resolution; metrics convert back
        // to logical size
        Ok(RasterizedGlyph {
            width: width as u32,
            height: metrics.height as u32,
            bearing_x: metrics.xmin as f32 / scale,
            bearing_y: metrics.ymin as f32 / scale,
            advance: metrics.advance_width / scale,
            coverage,
        })
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
                line_height: m.new_line_size,
            },
            // Fonts without horizontal metrics get a rough estimate
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
                line_height: px,
            },
        }
    }

    fn kern(&self, left: u16, right: u16, px: f32) -> f32 {
        self.font
            .horizontal_kern_indexed(left, right, px)
            .unwrap_or(0.0)
    }
}

/// Search and load a system font
///
/// Search order:
/// 1. GLYPHSTASH_FONT environment variable
/// 2. Known paths (hardcoded)
pub fn load_system_font() -> Result<Vec<u8>, FontError> {
    if let Ok(path) = std::env::var("GLYPHSTASH_FONT") {
        let data = std::fs::read(&path).map_err(|_| FontError::NotFound)?;
        info!("Font loaded: {} (GLYPHSTASH_FONT)", path);
        return Ok(data);
    }

    let candidates = [
        // Linux
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
        "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
        "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansMono-Regular.ttf",
        "/usr/share/fonts/noto/NotoSansMono-Regular.ttf",
        // macOS (development/testing)
        "/System/Library/Fonts/Monaco.ttf",
        "/Library/Fonts/Courier New.ttf",
    ];

    for path in &candidates {
        if let Ok(data) = std::fs::read(path) {
            info!("Font loaded: {}", path);
            return Ok(data);
        }
    }

    debug!("No system font found in known paths");
    Err(FontError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::NOTDEF;

    #[test]
    fn test_subpixel_phase_from_frac() {
        assert_eq!(SubpixelPhase::from_frac(0.0), SubpixelPhase::Phase0);
        assert_eq!(SubpixelPhase::from_frac(0.1), SubpixelPhase::Phase0);
        assert_eq!(SubpixelPhase::from_frac(0.3), SubpixelPhase::Phase1);
        assert_eq!(SubpixelPhase::from_frac(0.6), SubpixelPhase::Phase2);
        assert_eq!(SubpixelPhase::from_frac(0.9), SubpixelPhase::Phase0);
    }

    #[test]
    fn test_subpixel_phase_offsets() {
        assert_eq!(SubpixelPhase::Phase0.offset(), 0.0);
        assert!((SubpixelPhase::Phase1.offset() - 1.0 / 3.0).abs() < 1e-6);
        assert!((SubpixelPhase::Phase2.offset() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_shift_coverage_fractional() {
        // One row, two texels, shifted right half a pixel
        let (out, w) = shift_coverage(&[100, 200], 2, 1, 0.5);
        assert_eq!(w, 3);
        assert_eq!(out, vec![50, 150, 100]);
    }

    #[test]
    fn test_shift_coverage_whole_pixels() {
        let (out, w) = shift_coverage(&[100, 200], 2, 1, 1.0);
        assert_eq!(w, 3);
        assert_eq!(out, vec![0, 100, 200]);

        // Whole plus fraction: one empty column, then the blend
        let (out, w) = shift_coverage(&[100, 200], 2, 1, 1.5);
        assert_eq!(w, 4);
        assert_eq!(out, vec![0, 50, 150, 100]);
    }

    #[test]
    fn test_shift_preserves_total_coverage() {
        let src = [10u8, 250, 90];
        let (out, _) = shift_coverage(&src, 3, 1, 1.0 / 3.0);
        let before: u32 = src.iter().map(|&v| u32::from(v)).sum();
        let after: u32 = out.iter().map(|&v| u32::from(v)).sum();
        assert!((i64::from(before) - i64::from(after)).abs() <= 2);
    }

    #[test]
    fn test_empty_glyph() {
        let g = RasterizedGlyph::empty(7.5);
        assert!(g.is_empty());
        assert_eq!(g.advance, 7.5);
        assert!(g.coverage.is_empty());
    }

    #[test]
    fn test_bad_font_data_rejected() {
        assert!(VectorFont::from_bytes(&[0u8; 16], 1.0).is_err());
        assert!(VectorFont::from_bytes(b"not a font", 1.0).is_err());
    }

    #[test]
    fn test_system_font_rasterizes() {
        // Skip on machines without a known system font
        let Ok(data) = load_system_font() else {
            return;
        };
        let font = VectorFont::from_bytes(&data, 1.0).unwrap();

        let gid = font.glyph_index('A');
        assert_ne!(gid, NOTDEF);

        let glyph = font.rasterize(gid, 16.0, 0.0).unwrap();
        assert!(!glyph.is_empty());
        assert!(glyph.advance > 0.0);
        assert_eq!(glyph.coverage.len(), (glyph.width * glyph.height) as usize);

        // A subpixel offset widens the bitmap and changes its coverage
        let shifted = font.rasterize(gid, 16.0, 1.0 / 3.0).unwrap();
        assert_eq!(shifted.width, glyph.width + 1);
        assert_ne!(shifted.coverage, glyph.coverage);

        // Space carries advance but no pixels
        let space = font.rasterize(font.glyph_index(' '), 16.0, 0.0).unwrap();
        assert!(space.is_empty());
        assert!(space.advance > 0.0);

        let lm = font.line_metrics(16.0);
        assert!(lm.ascent > 0.0);
        assert!(lm.descent <= 0.0);
    }
}
