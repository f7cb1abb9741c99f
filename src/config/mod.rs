//! Cache configuration
//!
//! Plain-struct configuration with serde defaults, loadable from a
//! TOML fragment for applications that configure the cache from file.

use log::warn;
use serde::{Deserialize, Serialize};

/// Atlas cache settings
///
/// All fields have sensible defaults; missing TOML keys fall back to
/// them via `#[serde(default)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Atlas texture width in pixels (fixed at creation, no growth)
    pub width: u32,
    /// Atlas texture height in pixels
    pub height: u32,
    /// Empty border around each packed glyph, prevents sampling bleed
    pub padding: u32,
    /// Rasterize at size * oversample and report logical metrics
    /// (1.0 = off). Higher values trade atlas space for quality.
    pub oversample: f32,
    /// Quantize horizontal pen position into 1/3 px subpixel phases
    pub subpixel: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            padding: 1,
            oversample: 1.0,
            subpixel: false,
        }
    }
}

impl AtlasConfig {
    /// Parse from a TOML fragment
    ///
    /// ```
    /// let cfg = glyphstash::AtlasConfig::from_toml_str("width = 512\nheight = 512").unwrap();
    /// assert_eq!(cfg.width, 512);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cfg: Self = toml::from_str(s)?;
        Ok(cfg.validated())
    }

    /// Clamp out-of-range values back to usable ones, with a warning
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.width == 0 || self.height == 0 {
            warn!(
                "Invalid atlas size {}x{}, using {}x{}",
                self.width, self.height, defaults.width, defaults.height
            );
            self.width = defaults.width;
            self.height = defaults.height;
        }
        // Keep dimensions within common texture limits (and the pixel
        // buffer within u32 addressing)
        const MAX_DIM: u32 = 32768;
        if self.width > MAX_DIM || self.height > MAX_DIM {
            warn!(
                "Atlas size {}x{} too large, clamping to {}",
                self.width, self.height, MAX_DIM
            );
            self.width = self.width.min(MAX_DIM);
            self.height = self.height.min(MAX_DIM);
        }
        if !self.oversample.is_finite() || self.oversample < 1.0 {
            warn!("Invalid oversample {}, using 1.0", self.oversample);
            self.oversample = 1.0;
        }
        // Padding must leave room for at least a 1px glyph per shelf
        let max_pad = (self.width.min(self.height) / 2).saturating_sub(1);
        if self.padding > max_pad {
            warn!("Padding {} too large for atlas, using {}", self.padding, max_pad);
            self.padding = max_pad;
        }
        self
    }
}
