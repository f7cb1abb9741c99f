//! Dynamic glyph rasterization cache backed by a packed texture atlas.
//!
//! Fonts are registered with a [`GlyphCache`]; glyph lookups rasterize
//! on demand and pack 8-bit coverage bitmaps into one shared pixel
//! buffer. When the buffer fills, the cache clears itself and bumps a
//! generation counter that invalidates every previously issued
//! rectangle; callers re-resolve glyphs after observing a new
//! generation. Characters missing from the primary font are probed
//! through an ordered fallback chain.
//!
//! The crate produces atlas-space rectangles and pixel data; issuing
//! draw calls is the caller's responsibility. A render consumer reads
//! `{pixels, dirty region, generation}` and uploads into its own
//! backing texture:
//!
//! ```no_run
//! use glyphstash::{AtlasConfig, GlyphCache};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cache = GlyphCache::new(AtlasConfig::default());
//! let font = cache.register_font_bytes(&std::fs::read("mono.ttf")?)?;
//!
//! let slot = cache.glyph(font, 'g', 16.0)?;
//! let metrics = cache.measure(font, "hello", 16.0)?;
//!
//! if let Some(dirty) = cache.take_dirty() {
//!     // upload cache.pixels() within `dirty` to the GPU texture
//! }
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod cache;
pub mod config;
pub mod error;
pub mod font;
pub mod image;

pub use atlas::{DirtyRect, PackedRect};
pub use cache::{GlyphCache, GlyphKey, GlyphSlot, TextMetrics};
pub use config::AtlasConfig;
pub use error::{AtlasError, DecodeError, FontError, RasterError};
pub use font::{
    load_system_font, FallbackChain, FontId, GlyphSource, LineMetrics, RasterizedGlyph,
    SubpixelPhase, VectorFont, NOTDEF,
};

pub use crate::image::{decode, Pixmap};
