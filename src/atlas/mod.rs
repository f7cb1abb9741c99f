//! Atlas pixel buffer
//!
//! A fixed-size 8-bit coverage buffer shared by all cached glyphs,
//! with a generation counter identifying the current packing epoch
//! and a dirty-rectangle union tracking writes since the last upload.

pub mod packer;

pub use packer::{PackedRect, ShelfPacker};

/// Union of atlas areas written since the last `take_dirty()`.
/// Half-open: covers x0..x1, y0..y1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl DirtyRect {
    fn from_rect(rect: PackedRect) -> Self {
        Self {
            x0: rect.x,
            y0: rect.y,
            x1: rect.x + rect.width,
            y1: rect.y + rect.height,
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Fixed-size coverage buffer with generation and dirty tracking.
///
/// Dimensions never change after creation; exhaustion is handled by
/// the cache through `clear_and_advance`, not by growth.
pub struct Atlas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    generation: u64,
    dirty: Option<DirtyRect>,
}

impl Atlas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize],
            generation: 0,
            dirty: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current packing epoch; rectangles are valid only within the
    /// generation that issued them
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The full coverage buffer, row-major, one byte per pixel
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Region written since the last `take_dirty()`
    pub fn dirty(&self) -> Option<DirtyRect> {
        self.dirty
    }

    /// Snapshot-and-clear of the dirty region. The caller uploads the
    /// returned region before issuing further lookups.
    pub fn take_dirty(&mut self) -> Option<DirtyRect> {
        self.dirty.take()
    }

    /// Copy a coverage bitmap into the buffer and extend the dirty
    /// region. The rectangle must lie within the atlas (the packer
    /// guarantees this).
    pub(crate) fn blit(&mut self, rect: PackedRect, coverage: &[u8]) {
        let w = rect.width as usize;
        for row in 0..rect.height as usize {
            let src = row * w;
            let dst = ((rect.y as usize + row) * self.width as usize) + rect.x as usize;
            self.pixels[dst..dst + w].copy_from_slice(&coverage[src..src + w]);
        }
        self.mark_dirty(DirtyRect::from_rect(rect));
    }

    fn mark_dirty(&mut self, region: DirtyRect) {
        self.dirty = Some(match self.dirty {
            Some(d) => d.union(region),
            None => region,
        });
    }

    /// Wipe the buffer and advance to the next generation. The whole
    /// atlas becomes dirty so uploaders refresh their copy.
    pub(crate) fn clear_and_advance(&mut self) {
        self.pixels.fill(0);
        self.generation += 1;
        self.dirty = Some(DirtyRect {
            x0: 0,
            y0: 0,
            x1: self.width,
            y1: self.height,
        });
    }
}
