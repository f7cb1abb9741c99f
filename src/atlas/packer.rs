//! Shelf rectangle packer
//!
//! Allocates regions within a fixed-size area by organizing them into
//! horizontal shelves. Allocation-only: space is reclaimed solely by
//! `reset()`, which empties the whole area. Acceptable because glyph
//! sets are append-only within a packing epoch.

/// Region allocated within the atlas, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One horizontal shelf: a row of packed rectangles sharing a top y
#[derive(Debug, Clone, Copy)]
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// Shelf packer over a fixed width x height area
#[derive(Debug)]
pub struct ShelfPacker {
    width: u32,
    height: u32,
    shelves: Vec<Shelf>,
    /// Top of the first unopened shelf
    next_y: u32,
}

impl ShelfPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
            next_y: 0,
        }
    }

    /// True when a rectangle of this size could ever be placed,
    /// regardless of current occupancy
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }

    /// Allocate a region, or None when the area is full.
    ///
    /// Picks the shelf wasting the least height among those that fit
    /// (best-fit by height, bounding vertical fragmentation), else
    /// opens a new shelf at the lowest unused y.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<PackedRect> {
        if !self.fits(width, height) {
            return None;
        }

        let mut best: Option<(usize, u32)> = None;
        for (i, shelf) in self.shelves.iter().enumerate() {
            if height > shelf.height || shelf.cursor_x + width > self.width {
                continue;
            }
            let waste = shelf.height - height;
            if best.map_or(true, |(_, w)| waste < w) {
                best = Some((i, waste));
            }
        }

        if let Some((i, _)) = best {
            let shelf = &mut self.shelves[i];
            let rect = PackedRect {
                x: shelf.cursor_x,
                y: shelf.y,
                width,
                height,
            };
            shelf.cursor_x += width;
            return Some(rect);
        }

        // No shelf fits: open a new one if vertical space remains
        if self.next_y + height > self.height {
            return None;
        }
        let rect = PackedRect {
            x: 0,
            y: self.next_y,
            width,
            height,
        };
        self.shelves.push(Shelf {
            y: self.next_y,
            height,
            cursor_x: width,
        });
        self.next_y += height;
        Some(rect)
    }

    /// Mark the whole area free again
    pub fn reset(&mut self) {
        self.shelves.clear();
        self.next_y = 0;
    }
}
