//! Ship geometry and the inventory of ships still to place.

use crate::config::FleetEntry;

/// Orientation of a ship on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_horizontal(horizontal: bool) -> Self {
        if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// Cells occupied by a ship of `length` whose top-left cell is (`x`, `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    length: u32,
    x: i32,
    y: i32,
    orientation: Orientation,
}

impl Footprint {
    pub fn new(length: u32, x: i32, y: i32, orientation: Orientation) -> Self {
        Self {
            length,
            x,
            y,
            orientation,
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// `true` if every cell lies inside a `width` × `height` grid.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let (w, h) = match self.orientation {
            Orientation::Horizontal => (self.length as i64, 1),
            Orientation::Vertical => (1, self.length as i64),
        };
        let (x, y) = (self.x as i64, self.y as i64);
        x >= 0 && y >= 0 && x + w <= width as i64 && y + h <= height as i64
    }

    /// Occupied cells, starting at the origin. Only meaningful once
    /// [`Footprint::fits`] holds.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let Footprint {
            length,
            x,
            y,
            orientation,
        } = *self;
        (0..length as i32).map(move |i| match orientation {
            Orientation::Horizontal => (x + i, y),
            Orientation::Vertical => (x, y + i),
        })
    }
}

/// Ships not yet placed, one entry per distinct length, longest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipInventory {
    entries: Vec<FleetEntry>,
}

impl ShipInventory {
    pub fn new(fleet: &[FleetEntry]) -> Self {
        Self {
            entries: fleet.iter().copied().filter(|e| e.count > 0).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FleetEntry] {
        &self.entries
    }

    /// Index of the entry for `length`, searching from the most recently
    /// added entry backwards.
    pub fn find(&self, length: u32) -> Option<usize> {
        self.entries.iter().rposition(|e| e.length == length)
    }

    /// Length of the ship the inventory offers next.
    pub fn next_length(&self) -> Option<u32> {
        self.entries.last().map(|e| e.length)
    }

    /// Consume one ship from the entry at `index`, dropping the entry when
    /// it runs out.
    pub fn take(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.count -= 1;
            if entry.count == 0 {
                self.entries.remove(index);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
