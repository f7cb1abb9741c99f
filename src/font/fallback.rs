//! Fallback font chain
//!
//! Ordered list of fonts probed when the primary font cannot map a
//! character. Mutated only by explicit calls from the owning
//! application; read-only during lookups. No automatic promotion or
//! demotion based on hit frequency.

use super::FontId;

/// Ordered sequence of fallback fonts
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    fonts: Vec<FontId>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a font to the end of the chain; duplicates are ignored
    pub fn push(&mut self, font: FontId) {
        if !self.fonts.contains(&font) {
            self.fonts.push(font);
        }
    }

    /// Remove a font; returns false when it was not in the chain
    pub fn remove(&mut self, font: FontId) -> bool {
        let before = self.fonts.len();
        self.fonts.retain(|&f| f != font);
        self.fonts.len() != before
    }

    /// Move a font to a new position (clamped to the chain length);
    /// returns false when the font is not in the chain
    pub fn reorder(&mut self, font: FontId, index: usize) -> bool {
        if !self.remove(font) {
            return false;
        }
        let index = index.min(self.fonts.len());
        self.fonts.insert(index, font);
        true
    }

    pub fn clear(&mut self) {
        self.fonts.clear();
    }

    /// Fonts in probe order, primary excluded
    pub fn fonts(&self) -> &[FontId] {
        &self.fonts
    }
}
